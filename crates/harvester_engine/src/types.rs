use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::persist::PersistError;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Bytes,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

/// Asset transfer failure. Never swallowed by the fetcher itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Failure reported by the rendering capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("loading {url} exceeded {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    #[error("http status {status} while loading {url}")]
    HttpStatus { url: String, status: u16 },
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },
    #[error("renderer could not be launched: {0}")]
    Launch(String),
}

impl RenderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RenderError::Timeout { .. })
    }
}

/// Conditions that end a harvest run. Records already persisted stay valid.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("start page {url} did not load within {timeout:?}")]
    PageLoadTimeout { url: String, timeout: Duration },
    #[error("start page could not be read: {0}")]
    StartPage(RenderError),
    #[error("no owner name found in `{selector}` on the start page")]
    OwnerMissing { selector: String },
    #[error("invalid {name} url `{value}`: {message}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        message: String,
    },
    #[error(transparent)]
    Launch(RenderError),
    #[error("asset directory unusable: {0}")]
    AssetDir(#[from] PersistError),
    #[error("record store unusable: {0}")]
    Store(#[from] StoreError),
}
