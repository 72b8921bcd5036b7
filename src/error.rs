use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ThresherError {
    /// Socket-level fault: refused connect, reset, truncated frame.
    Transport(String),
    /// A non-blocking receive found nothing ready. The only retryable class.
    NotReady,
    Config(String),
    ArtifactExists(PathBuf),
    ArtifactMissing(PathBuf),
    Serialization(Box<bincode::error::EncodeError>),
    Deserialization(Box<bincode::error::DecodeError>),
    Io(std::io::Error),
    Other(String),
}

impl ThresherError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ThresherError::NotReady)
    }
}

impl fmt::Display for ThresherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresherError::Transport(e) => write!(f, "Transport error: {}", e),
            ThresherError::NotReady => write!(f, "Receive would block: no message ready"),
            ThresherError::Config(e) => write!(f, "Configuration error: {}", e),
            ThresherError::ArtifactExists(p) => {
                write!(f, "Artifact already exists (pass overwrite to replace): {}", p.display())
            }
            ThresherError::ArtifactMissing(p) => write!(f, "Artifact not found: {}", p.display()),
            ThresherError::Serialization(e) => write!(f, "Serialization error: {}", e),
            ThresherError::Deserialization(e) => write!(f, "Deserialization error: {}", e),
            ThresherError::Io(e) => write!(f, "IO error: {}", e),
            ThresherError::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for ThresherError {}

impl From<Box<bincode::error::EncodeError>> for ThresherError {
    fn from(err: Box<bincode::error::EncodeError>) -> Self {
        ThresherError::Serialization(err)
    }
}

impl From<bincode::error::EncodeError> for ThresherError {
    fn from(err: bincode::error::EncodeError) -> Self {
        ThresherError::Serialization(Box::new(err))
    }
}

impl From<Box<bincode::error::DecodeError>> for ThresherError {
    fn from(err: Box<bincode::error::DecodeError>) -> Self {
        ThresherError::Deserialization(err)
    }
}

impl From<bincode::error::DecodeError> for ThresherError {
    fn from(err: bincode::error::DecodeError) -> Self {
        ThresherError::Deserialization(Box::new(err))
    }
}

impl From<std::io::Error> for ThresherError {
    fn from(err: std::io::Error) -> Self {
        ThresherError::Io(err)
    }
}

impl From<String> for ThresherError {
    fn from(err: String) -> Self {
        ThresherError::Other(err)
    }
}

impl From<&str> for ThresherError {
    fn from(err: &str) -> Self {
        ThresherError::Other(err.to_string())
    }
}
