use std::result;

use thiserror::Error;

pub type Result<T> = result::Result<T, CommonError>;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("ConfigError: {0:?}")]
    Config(#[from] ::config::ConfigError),
    #[error("InvalidConfig: {0}")]
    InvalidConfig(String),
    #[error("Tracing: {0}")]
    Tracing(String),
}
