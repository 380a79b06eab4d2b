//! The JSON envelope every endpoint answers with.
//!
//! Transport status is always 200; clients branch on `code`.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    ServerError,
    ParameterError,
    AuthError,
}

impl ResponseCode {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ServerError => 1,
            Self::ParameterError => 2,
            Self::AuthError => 3,
        }
    }
}

impl Serialize for ResponseCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: ResponseCode,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: ResponseCode::Success,
            message: "succeed".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn ok() -> Self {
        Self {
            code: ResponseCode::Success,
            message: "succeed".to_string(),
            data: None,
        }
    }

    pub fn failure(code: ResponseCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Payload shape of list endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdList {
    pub ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_numeric_codes() {
        let body = serde_json::to_value(ApiResponse::success(IdList { ids: vec![3, 2] })).unwrap();
        assert_eq!(body["code"], 0);
        assert_eq!(body["message"], "succeed");
        assert_eq!(body["data"]["ids"], serde_json::json!([3, 2]));

        let body = serde_json::to_value(ApiResponse::failure(ResponseCode::AuthError, "nope")).unwrap();
        assert_eq!(body["code"], 3);
        assert!(body["data"].is_null());
    }
}
