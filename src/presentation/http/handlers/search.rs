use axum::extract::{Query, State, rejection::QueryRejection};
use serde::Deserialize;

use crate::presentation::http::{
    errors::AppError,
    response::{ApiResponse, IdList},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// Post ids matching `q`, as ranked by the search service.
pub async fn search_posts(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<ApiResponse<IdList>, AppError> {
    let Query(params) = query?;
    let ids = state.posts.search(&params.q).await?;
    Ok(ApiResponse::success(IdList { ids }))
}
