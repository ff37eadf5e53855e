//! Unified error types for the route engine.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the route engine.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Invalid configuration values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Route lookup/resolution error.
    #[error("route error: {0}")]
    Route(#[from] RouteError),

    /// Route definition file error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Request dispatch error.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Request ledger error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Route resolution errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The route key is not declared in the route table.
    #[error("route `{route}` is not declared")]
    NotFound {
        /// The lower-cased key that was looked up.
        route: String,
    },
}

/// Route definition file errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Creating or rewriting the definition file failed.
    #[error("failed to write route file {path}: {source}")]
    TemplateIo {
        /// File or directory that could not be written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Reading the definition file failed.
    #[error("failed to read route file {path}: {source}")]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The definition file is not valid YAML.
    #[error("failed to parse route file {path}: {source}")]
    Parse {
        /// File that could not be parsed.
        path: PathBuf,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },
}

/// Request dispatch errors.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Neither an override nor a configured base URL is available.
    #[error("no base URL configured for route `{route}`")]
    MissingBaseUrl {
        /// Route key of the request.
        route: String,
    },

    /// Base URL and resolved path do not form a valid URL.
    #[error("invalid request URL {url}: {reason}")]
    InvalidUrl {
        /// The URL that failed to parse.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// Connection, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A successful response carried a body that is not a JSON object.
    #[error("malformed response body (HTTP {status}): {reason}")]
    MalformedBody {
        /// HTTP status of the response.
        status: u16,
        /// Parser message.
        reason: String,
    },

    /// Dispatch was requested outside a Tokio runtime.
    #[error("no async runtime available: {0}")]
    NoRuntime(String),

    /// The worker task panicked or was cancelled.
    #[error("dispatch task aborted: {0}")]
    Aborted(String),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Request ledger errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Status is not one of `pending`, `success`, `error`.
    #[error("invalid status `{0}`: must be 'pending', 'success' or 'error'")]
    InvalidStatus(String),
}

/// Response envelope errors. Captured inside the envelope, never returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The body is not a JSON object.
    #[error("failed to parse response body: {0}")]
    Parse(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ConnectError>;
