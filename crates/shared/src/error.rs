use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    Unavailable,
}

/// Error body returned by the menu backend on non-success statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_uses_snake_case_on_the_wire() {
        let body = serde_json::to_value(ApiError::new(ErrorCode::Unavailable, "kitchen closed"))
            .expect("serialize");
        assert_eq!(body["code"], "unavailable");
        assert_eq!(body["message"], "kitchen closed");
    }
}
