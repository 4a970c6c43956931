use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Download(String),
    Decode(String),
    Encode(String),
    EmptySubscription,
    NoReachableNodes,
    Config(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Download(msg) => write!(f, "Subscription download failed: {}", msg),
            FetchError::Decode(msg) => write!(f, "Subscription decode failed: {}", msg),
            FetchError::Encode(msg) => write!(f, "Node encode failed: {}", msg),
            FetchError::EmptySubscription => write!(f, "Subscription contains no usable vmess nodes"),
            FetchError::NoReachableNodes => write!(f, "No reachable nodes"),
            FetchError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

pub type Result<T> = std::result::Result<T, FetchError>;
