use std::path::PathBuf;
use thiserror::Error;

/// Crate-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Rejected user input. Messages are shown to the user verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter some text to analyze")]
    EmptyText,
    #[error("Please enter a URL to analyze")]
    EmptyUrl,
    #[error("Please enter a valid URL starting with http:// or https://")]
    InvalidUrl,
    #[error("Please select a file to analyze")]
    MissingFile,
    #[error("Please select a valid file type (text, image, or PDF)")]
    UnsupportedFileType(String),
    #[error("File size must be less than 10MB")]
    FileTooLarge(usize),
    #[error("Email is required")]
    EmailRequired,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Failed to persist session: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("analysis service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {message}")]
    InvalidValue {
        key: &'static str,
        value: String,
        message: String,
    },
}
