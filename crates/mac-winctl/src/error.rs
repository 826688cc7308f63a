use thiserror::Error;

/// Errors that can occur during window operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Accessibility permission is required but not granted.
    #[error("Accessibility permission missing")]
    Permission,

    /// Failed to create an Accessibility API application element.
    #[error("Failed to create AX application element")]
    AppElement,

    /// An Accessibility API operation failed with the given error code.
    #[error("AX operation failed: code {0}")]
    AxCode(i32),

    /// The control handle no longer resolves to a live window.
    #[error("window gone: control handle did not resolve")]
    WindowGone,

    /// The requested attribute or operation is not supported by the window.
    #[error("Unsupported attribute")]
    Unsupported,

    /// Failed to activate the application.
    #[error("Activation failed")]
    ActivationFailed,
}

/// Result alias for window operations.
pub type Result<T> = std::result::Result<T, Error>;
