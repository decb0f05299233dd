pub type GridcastResult<T> = Result<T, GridcastError>;

#[derive(thiserror::Error, Debug)]
pub enum GridcastError {
    #[error("no valid feeds: {0}")]
    NoValidFeeds(String),

    #[error("pipeline worker is already running")]
    AlreadyRunning,

    #[error("no pipeline worker is running")]
    NotRunning,

    #[error("spawn error: {0}")]
    Spawn(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("signaling error: {0}")]
    Signaling(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GridcastError {
    pub fn no_valid_feeds(msg: impl Into<String>) -> Self {
        Self::NoValidFeeds(msg.into())
    }

    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::Spawn(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn signaling(msg: impl Into<String>) -> Self {
        Self::Signaling(msg.into())
    }
}
