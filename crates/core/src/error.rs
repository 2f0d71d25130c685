use thiserror::Error;

pub type SuggestResult<T> = Result<T, SuggestError>;

#[derive(Error, Debug)]
pub enum SuggestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Interaction history error: {0}")]
    History(String),

    #[error("Similarity index error: {0}")]
    SimilarityIndex(String),

    #[error("Catalog lookup error: {0}")]
    Catalog(String),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
