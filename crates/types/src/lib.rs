//! Shared failure taxonomy for Toolsmith tool handlers.
//!
//! - [`ErrorKind`]: the closed set of failure kinds, with total status and
//!   suggestion lookups
//! - [`OperationError`]: the structured failure value returned by tools
//! - [`OperationError::from_failure`]: the single conversion point for
//!   failures of any other shape
//! - [`ApiError`]: the error shape raised by domain services

mod context;
mod conversion;
mod kind;
mod operation;
mod upstream;

pub use context::ErrorContext;
pub use conversion::RawFailure;
pub use kind::{ErrorCategory, ErrorKind, GENERIC_SUGGESTION};
pub use operation::{OperationError, OperationResult, UNKNOWN_ERROR_MESSAGE};
pub use upstream::ApiError;
