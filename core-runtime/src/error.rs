use thiserror::Error;

/// Errors produced while assembling or operating the playback runtime.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid runtime or logging configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host capability was not registered before build.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// Invariant violation inside the runtime itself.
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
