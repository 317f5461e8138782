use std::error::Error;
use std::fmt;
use std::time::Duration;

use harvester_core::Termination;

/// Transport or decoding failure of a single API call.
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

impl Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
        }
    }
}

/// Progress notifications emitted by the harvest loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    BatchCompleted {
        batch: u64,
        new_links: usize,
        unique_links: usize,
    },
    CycleFailed {
        batch: u64,
        attempt: u32,
        error: String,
        retry_in: Option<Duration>,
    },
    ApiError {
        code: String,
        info: Option<String>,
    },
    Finished {
        termination: Option<Termination>,
        unique_links: usize,
    },
}
