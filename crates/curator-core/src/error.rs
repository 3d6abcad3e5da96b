use thiserror::Error;

#[derive(Debug, Error)]
pub enum CuratorError {
    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("duplicate rule for author '{0}'")]
    DuplicateRule(String),

    #[error("weight {0} out of range: must be between -100 and 100 percent")]
    WeightOutOfRange(f64),

    #[error("state store error: {0}")]
    Store(String),

    #[error("action already recorded: {author}/{content_id}")]
    AlreadyRecorded { author: String, content_id: String },

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("home directory not found: set HOME or pass --state-dir")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CuratorError>;
