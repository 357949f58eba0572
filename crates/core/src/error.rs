//! Unified error types for the ingestion engine.
//!
//! Every error raised while a job runs is soft: it is logged and the job
//! moves on to the next record, zone, or iteration. The codes below show up
//! in log lines so failures can be grepped by class:
//! - FETCH_001-006: provider fetch failures (zone skipped)
//! - PARSE_001-003: payload field failures (record skipped)
//! - STORE_001-004: store failures (record or iteration skipped)
//! - SCHED_001-003: scheduler misuse (startup only)

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure to obtain a usable payload from an external provider.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// FETCH_001: the request did not complete within the client timeout.
    #[error("request timed out")]
    Timeout,
    /// FETCH_002: connection, TLS, or other transport failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// FETCH_003: provider answered with a non-2xx status.
    #[error("unexpected status {0}")]
    Status(u16),
    /// FETCH_004: provider answered 2xx but flagged an error in the body.
    #[error("provider error: {0}")]
    Provider(String),
    /// FETCH_005: body could not be decoded into the provider shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// FETCH_006: well-formed answer with nothing to ingest.
    #[error("no data: {0}")]
    NoData(String),
}

impl FetchError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "FETCH_001",
            Self::Transport(_) => "FETCH_002",
            Self::Status(_) => "FETCH_003",
            Self::Provider(_) => "FETCH_004",
            Self::Decode(_) => "FETCH_005",
            Self::NoData(_) => "FETCH_006",
        }
    }
}

/// A single record in a payload could not be mapped to an indicator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    /// PARSE_001
    #[error("missing field: {0}")]
    MissingField(String),
    /// PARSE_002
    #[error("null value for {0}")]
    NullValue(String),
    /// PARSE_003
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "PARSE_001",
            Self::NullValue(_) => "PARSE_002",
            Self::InvalidTimestamp { .. } => "PARSE_003",
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn null(field: impl Into<String>) -> Self {
        Self::NullValue(field.into())
    }
}

/// Store-level failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// STORE_001
    #[error("query failed: {0}")]
    Query(String),
    /// STORE_002
    #[error("write failed: {0}")]
    Write(String),
    /// STORE_003
    #[error("delete failed: {0}")]
    Delete(String),
    /// STORE_004
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Query(_) => "STORE_001",
            Self::Write(_) => "STORE_002",
            Self::Delete(_) => "STORE_003",
            Self::Unavailable(_) => "STORE_004",
        }
    }
}

/// Scheduler misuse, reported synchronously at startup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchedulerError {
    /// SCHED_001
    #[error("scheduler already started")]
    AlreadyStarted,
    /// SCHED_002
    #[error("job {0:?} is already registered")]
    DuplicateJob(String),
    /// SCHED_003
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}

impl SchedulerError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyStarted => "SCHED_001",
            Self::DuplicateJob(_) => "SCHED_002",
            Self::InvalidSchedule(_) => "SCHED_003",
        }
    }
}

/// Unified error type for the ingestion engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("[{}] {0}", .0.code())]
    Fetch(#[from] FetchError),

    #[error("[{}] {0}", .0.code())]
    Parse(#[from] ParseError),

    #[error("[{}] {0}", .0.code())]
    Store(#[from] StoreError),

    #[error("[{}] {0}", .0.code())]
    Scheduler(#[from] SchedulerError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Fetch(e) => Some(e.code()),
            Self::Parse(e) => Some(e.code()),
            Self::Store(e) => Some(e.code()),
            Self::Scheduler(e) => Some(e.code()),
            _ => None,
        }
    }
}
