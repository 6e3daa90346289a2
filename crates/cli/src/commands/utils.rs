use serde_json::Value;
use std::fmt;
use strata_core::{provider::ProviderError, transport::TransportError};

#[derive(Debug)]
pub enum CliError {
    Config(String),
    Io(String),
    Network(String),
    InvalidInput(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Network(msg) => write!(f, "Network error: {msg}"),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidInput(error.to_string())
    }
}

impl From<ProviderError> for CliError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Config(msg) => Self::Config(msg),
            other => Self::Network(other.to_string()),
        }
    }
}

impl From<TransportError> for CliError {
    fn from(error: TransportError) -> Self {
        Self::Network(error.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

pub fn print_success(message: &str) {
    println!("[SUCCESS] {message}");
}

pub fn print_error(message: &str) {
    eprintln!("[ERROR] {message}");
}

pub fn print_info(message: &str) {
    println!("[INFO] {message}");
}

/// Parses optional JSON text, requiring it to be a value of the expected shape.
pub fn parse_json_arg(
    input: Option<&str>,
    what: &str,
    expected: &str,
    accept: fn(&Value) -> bool,
) -> CliResult<Option<Value>> {
    let Some(text) = input else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(text)?;
    if !accept(&value) {
        return Err(CliError::InvalidInput(format!("{what} must be {expected}, got {text}")));
    }
    Ok(Some(value))
}
