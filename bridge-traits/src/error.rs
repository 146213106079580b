use thiserror::Error;

/// Failures surfaced by host bridge implementations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host has no implementation for the requested capability.
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    /// The bridge exists but the call failed.
    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The bridge was asked to act after its resources were released.
    #[error("Bridge shut down: {0}")]
    ShutDown(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
