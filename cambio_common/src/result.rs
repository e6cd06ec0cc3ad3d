//! Result type alias shared across the workspace.
//!
//! Defaults the error type to the common `CambioError`, so functions can simply
//! return `Result<T>`.
use crate::error::CambioError;

/// Workspace-wide `Result` alias with `CambioError` as the default error.
pub type Result<T, E = CambioError> = std::result::Result<T, E>;
