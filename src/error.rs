//! Error types for the gait access-control core.

use thiserror::Error;

/// Result alias for access-control operations
pub type Result<T> = std::result::Result<T, AccessError>;

/// Failures raised by the classifier stage.
///
/// Per-image failures are absorbed into the verification batch as degraded
/// slots; they never abort a session on their own.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Classifier invoked before the model finished loading
    #[error("model not loaded")]
    ModelNotLoaded,

    /// Input could not be decoded as an image, or has zero spatial dimensions
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Runtime failure inside the inference session
    #[error("inference failed: {0}")]
    Inference(String),

    /// Per-call inference deadline exceeded; treated the same as Inference
    #[error("inference timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Model artifact could not be resolved (download, checksum, session build)
    #[error("model artifact error: {0}")]
    Artifact(String),
}

/// Failures raised by the verification pipeline and session controller.
#[derive(Error, Debug)]
pub enum AccessError {
    /// Verifier invoked with a batch size other than the configured N.
    /// Contract violation - propagates, never coerced.
    #[error("invalid batch size: expected {expected}, got {actual}")]
    InvalidBatchSize { expected: usize, actual: usize },

    /// Identity verified but no matching person record is enrolled
    #[error("no person record enrolled for identity '{0}'")]
    UnknownPersonRecord(String),

    /// start() called while a session is already in flight
    #[error("a verification session is already in progress")]
    SessionBusy,

    /// Session was reset while in flight; its results were discarded
    #[error("session cancelled")]
    SessionCancelled,

    /// Image source failed to supply the requested batch
    #[error("image source error: {0}")]
    ImageSource(String),

    /// Configuration loading or validation error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Classifier-stage failure surfaced outside a verification batch
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}
