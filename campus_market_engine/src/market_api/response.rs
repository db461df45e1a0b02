use serde::{Deserialize, Serialize};

use crate::market_api::errors::{ErrorCode, MarketError};

/// The tagged result handed to route handlers:
/// `{"ok": true, "data": ...}` or `{"ok": false, "errorCode": "...", "message": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error_code: None, message: None }
    }

    pub fn failure(error: &MarketError) -> Self {
        Self { ok: false, data: None, error_code: Some(error.code()), message: Some(error.to_string()) }
    }
}

impl<T> From<Result<T, MarketError>> for ApiResponse<T> {
    fn from(result: Result<T, MarketError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::failure(&e),
        }
    }
}
