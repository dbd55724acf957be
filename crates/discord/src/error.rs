use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Serenity(#[from] serenity::Error),

    #[error("invalid discord id: {id}")]
    InvalidId { id: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
