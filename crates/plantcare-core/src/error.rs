use thiserror::Error;

/// Failure taxonomy for the tips pipeline.
///
/// `Load`, `StoreWrite` and `StoreRead` are recoverable by degrading to
/// direct generation; `Config` and `Generation` always reach the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Knowledge base load failed: {0}")]
    Load(String),

    #[error("Store write failed: {0}")]
    StoreWrite(String),

    #[error("Store read failed: {0}")]
    StoreRead(String),

    #[error("Generation failed: {0}")]
    Generation(String),
}

impl Error {
    /// True for failures of the optional retrieval path.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Load(_) | Error::StoreWrite(_) | Error::StoreRead(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
