/*
 * Error types shared by the whole crate. Every fallible platform operation
 * returns `Result<T>` from this module so callers can propagate failures with
 * `?` and log them uniformly.
 *
 * The taxonomy is deliberately small: configuration problems are caught
 * before any native resource is acquired, native failures carry the formatted
 * Win32 error text, and broken internal invariants are not represented here
 * at all (those are programming errors and assert instead of returning).
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    /// Process-wide setup failed (window class registration and the like).
    #[error("platform initialization failed: {0}")]
    InitializationFailed(String),

    /// A creation request violated a precondition (archetype/owner/positioner
    /// mismatch, min size above max size). Nothing native was created.
    #[error("invalid window configuration: {0}")]
    InvalidConfiguration(String),

    /// The native window or one of its companion resources could not be
    /// created. Nothing is registered.
    #[error("window creation failed: {0}")]
    WindowCreationFailed(String),

    /// An operation referenced a window or view that is not (or no longer)
    /// known to the controller.
    #[error("invalid window handle: {0}")]
    InvalidHandle(String),

    /// A native call failed after the window was realized.
    #[error("platform operation failed: {0}")]
    OperationFailed(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

#[cfg(target_os = "windows")]
impl From<windows::core::Error> for PlatformError {
    fn from(err: windows::core::Error) -> Self {
        PlatformError::OperationFailed(err.to_string())
    }
}
