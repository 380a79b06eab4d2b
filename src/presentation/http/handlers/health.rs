use crate::presentation::http::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    version: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = match &state.db {
        Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => "up",
            Err(e) => {
                tracing::error!("Health check failed: database unreachable: {}", e);
                "down"
            }
        },
        // In-memory backends
        None => "disabled",
    };

    let (code, status) = if db_status == "down" {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        code,
        Json(HealthResponse {
            status,
            database: db_status,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
