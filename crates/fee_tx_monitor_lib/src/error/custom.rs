use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone)]
pub struct CustomError {
    pub msg: String,
}

impl CustomError {
    pub fn new(msg: &str) -> Self {
        Self {
            msg: msg.to_string(),
        }
    }
}

impl Display for CustomError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for CustomError {}

/// The node refused to admit the transaction into its pool.
///
/// Serialized as-is into the `error` field of the run verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Display for RejectedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Transaction rejected by node (code {}): {}",
            self.code, self.message
        )
    }
}

impl std::error::Error for RejectedError {}

/// A same-nonce transaction did not raise the offered fee enough to displace the pooled one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplacementUnderpricedError {
    pub message: String,
}

impl ReplacementUnderpricedError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl Display for ReplacementUnderpricedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Replacement underpriced: {}", self.message)
    }
}

impl std::error::Error for ReplacementUnderpricedError {}
