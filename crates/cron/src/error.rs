use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("flip interval must be greater than zero")]
    ZeroInterval,

    #[error("flip scheduler already started")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, Error>;
