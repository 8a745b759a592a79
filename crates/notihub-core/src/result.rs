//! Convenience result type alias for NotiHub.

use crate::error::AppError;

/// A specialized `Result` type for NotiHub operations.
pub type AppResult<T> = Result<T, AppError>;
