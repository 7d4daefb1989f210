pub mod indexing;
pub mod search;
pub mod statistics;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use lemmasearch_backend::error::ServiceError;

/// `{"result": ...}` envelope / 统一响应
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            result: true,
            error: None,
            code: None,
        }
    }

    pub fn error(err: &ServiceError) -> Self {
        Self {
            result: false,
            error: Some(err.to_string()),
            code: Some(err.code()),
        }
    }
}

/// Handler error; user errors answer 200 with `result: false` / 处理器错误
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_user_error() {
            StatusCode::OK
        } else {
            tracing::error!("request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(ApiResponse::error(&self.0))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelopes() {
        let ok = serde_json::to_value(ApiResponse::ok()).unwrap();
        assert_eq!(ok, serde_json::json!({"result": true}));

        let err = serde_json::to_value(ApiResponse::error(&ServiceError::NotRunning)).unwrap();
        assert_eq!(err["result"], false);
        assert_eq!(err["code"], "not_running");
        assert_eq!(err["error"], "indexing is not running");
    }

    #[test]
    fn test_status_codes() {
        let user = ApiError(ServiceError::EmptyQuery).into_response();
        assert_eq!(user.status(), StatusCode::OK);
        let infra = ApiError(ServiceError::Storage(sqlx::Error::RowNotFound)).into_response();
        assert_eq!(infra.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
