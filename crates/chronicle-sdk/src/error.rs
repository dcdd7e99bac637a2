use std::path::PathBuf;

use thiserror::Error;

use chronicle_engine::EngineError;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("cannot read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type SdkResult<T> = Result<T, SdkError>;
