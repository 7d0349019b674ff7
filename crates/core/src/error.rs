#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to read configuration file: {0}")]
    ConfigRead(std::io::Error),
    #[error("configuration schema mismatch at {0}")]
    ConfigSchema(String),
}

pub type ChartResult<T> = std::result::Result<T, ChartError>;
