use jobstore::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Job store error: {0}")]
    Job(#[from] StoreError),

    #[error("Generation failed: {0}")]
    Failed(String),
}
