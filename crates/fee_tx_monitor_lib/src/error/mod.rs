mod bag;
mod custom;
mod wrapped;

pub use bag::ErrorBag;
pub use custom::{CustomError, RejectedError, ReplacementUnderpricedError};
pub use wrapped::MonitorError;

/// Export macros for creating errors
mod macros;
