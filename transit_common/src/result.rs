//! Result type alias shared across the workspace.
//!
//! Defaults the error type to `TransitError`, so functions can simply return
//! `Result<T>`.
use crate::error::TransitError;

/// Workspace-wide `Result` alias with `TransitError` as the default error.
pub type Result<T, E = TransitError> = std::result::Result<T, E>;
