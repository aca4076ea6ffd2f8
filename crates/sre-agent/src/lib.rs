pub mod agent;
pub mod config;
pub mod logs;
pub mod metrics;
pub mod server;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_message_names_the_problem() {
        let err = Error::Config("GEMINI_API_KEY is not set".to_string());
        assert_eq!(err.to_string(), "Configuration error: GEMINI_API_KEY is not set");
    }
}
