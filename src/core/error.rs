use thiserror::Error;

/// Error type covering the lifetime of a classification pipeline.
#[derive(Debug, Error)]
pub enum PredictionError {
    /// The classification model could not be loaded. Fatal: pipeline
    /// construction aborts instead of handing out a half-built pipeline.
    #[error("classification model unavailable: {0}")]
    ModelUnavailable(String),

    /// A single inference call failed. Recoverable: the pipeline reports
    /// an absent result to the caller instead of propagating.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// Inference succeeded but the model produced zero predictions.
    #[error("the model produced no predictions")]
    NoResults,
}
