//! Wire envelope shared by every command.

use serde::Serialize;

use crate::error::{AppError, Result};

/// `{success, data?, error?}` as the renderer expects it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Response<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: &AppError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

impl<T> From<Result<T>> for Response<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => {
                tracing::warn!(error = %err, "command failed");
                Self::err(&err)
            }
        }
    }
}

/// What every command returns. Tauri wants a `Result` from async commands
/// that borrow their state; failures already travel inside the envelope,
/// so the outer `Err` is never produced.
pub type Reply<T> = std::result::Result<Response<T>, AppError>;

pub fn reply<T>(result: Result<T>) -> Reply<T> {
    Ok(result.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_shape() {
        let response: Response<()> = Err(AppError::NotRunning("task 7".into())).into();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"success": false, "error": "task 7 is not running"})
        );
    }

    #[test]
    fn test_success_shape() {
        let response: Response<u32> = Ok(42).into();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, serde_json::json!({"success": true, "data": 42}));
    }

    #[test]
    fn test_reply_wraps_success() {
        let wrapped = reply(Ok(vec!["llava"])).unwrap();
        let value = serde_json::to_value(&wrapped).unwrap();
        assert_eq!(value, serde_json::json!({"success": true, "data": ["llava"]}));
    }
}
