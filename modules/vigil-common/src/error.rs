use thiserror::Error;

pub type Result<T> = std::result::Result<T, VigilError>;

#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
