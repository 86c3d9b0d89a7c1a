use std::fmt::{Display, Formatter};

use super::bag::ErrorBag;

#[derive(Debug)]
pub struct MonitorError {
    pub inner: ErrorBag,
    pub file: &'static str,
    pub line: u32,
}

impl MonitorError {
    pub fn new(inner: ErrorBag, file: &'static str, line: u32) -> Self {
        Self { inner, file, line }
    }

    /// Node refused the transaction outright; no nonce was consumed.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.inner,
            ErrorBag::Rejected(_) | ErrorBag::ReplacementUnderpriced(_)
        )
    }

    pub fn is_replacement_underpriced(&self) -> bool {
        matches!(self.inner, ErrorBag::ReplacementUnderpriced(_))
    }

    /// Payload attached to a failed verdict, `None` for errors that are not node rejections.
    pub fn rejection_payload(&self) -> Option<serde_json::Value> {
        match &self.inner {
            ErrorBag::Rejected(e) => serde_json::to_value(e).ok(),
            ErrorBag::ReplacementUnderpriced(e) => serde_json::to_value(e).ok(),
            _ => None,
        }
    }
}

impl Display for MonitorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (at {}:{})", self.inner, self.file, self.line)
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}
