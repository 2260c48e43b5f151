use thiserror::Error;

use gsg_providers::ProviderClientError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Upstream error: {0}")]
    Provider(#[from] ProviderClientError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
