//! Error types for backrooms
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for backrooms operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,
    CredentialsMissing = 103,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Connection errors (3xx)
    ConnectionFailed = 300,
    BindFailed = 301,

    // Protocol errors (4xx)
    ProtocolMalformed = 400,
    ProtocolUnexpected = 401,

    // Provider errors (5xx)
    ProviderRequest = 500,
    ProviderStatus = 501,
    ProviderMalformed = 502,
    ProviderEmpty = 503,

    // Storage errors (6xx)
    StorageRead = 600,
    StorageWrite = 601,
    StorageCorrupt = 602,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
            500..=599 => 50,
            600..=699 => 60,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Provider credentials required but absent
    #[error("No API key configured for provider at {base_url}")]
    CredentialsMissing { base_url: String },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Connection Errors
    // ─────────────────────────────────────────────────────────────

    /// Could not bind the listening socket
    #[error("Failed to bind {addr}: {message}")]
    BindFailed { addr: String, message: String },

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    // ─────────────────────────────────────────────────────────────
    // Protocol Errors
    // ─────────────────────────────────────────────────────────────

    /// Malformed client frame
    #[error("Malformed client message: {message}")]
    ProtocolMalformed { message: String },

    // ─────────────────────────────────────────────────────────────
    // Provider Errors
    // ─────────────────────────────────────────────────────────────

    /// Transport-level failure talking to the provider
    #[error("Provider request failed: {message}")]
    ProviderRequest { message: String },

    /// Provider answered with a non-success status
    #[error("Provider returned status {status}: {body}")]
    ProviderStatus { status: u16, body: String },

    /// Provider response could not be decoded
    #[error("Malformed provider response: {message}")]
    ProviderMalformed { message: String },

    /// Provider response carried no usable text
    #[error("Provider returned no content for model {model_id}")]
    ProviderEmpty { model_id: String },

    // ─────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────

    /// Ledger file unreadable
    #[error("Failed to read usage ledger {path}: {message}")]
    StorageRead { path: PathBuf, message: String },

    /// Ledger file unwritable
    #[error("Failed to write usage ledger {path}: {message}")]
    StorageWrite { path: PathBuf, message: String },

    /// Ledger file present but not a valid record
    #[error("Usage ledger {path} is corrupt: {message}")]
    StorageCorrupt { path: PathBuf, message: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::CredentialsMissing { .. } => ErrorCode::CredentialsMissing,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::BindFailed { .. } => ErrorCode::BindFailed,
            Error::WebSocket(_) => ErrorCode::ConnectionFailed,

            Error::ProtocolMalformed { .. } => ErrorCode::ProtocolMalformed,

            Error::ProviderRequest { .. } => ErrorCode::ProviderRequest,
            Error::ProviderStatus { .. } => ErrorCode::ProviderStatus,
            Error::ProviderMalformed { .. } => ErrorCode::ProviderMalformed,
            Error::ProviderEmpty { .. } => ErrorCode::ProviderEmpty,

            Error::StorageRead { .. } => ErrorCode::StorageRead,
            Error::StorageWrite { .. } => ErrorCode::StorageWrite,
            Error::StorageCorrupt { .. } => ErrorCode::StorageCorrupt,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error comes from the completion provider
    pub fn is_provider(&self) -> bool {
        matches!(
            self,
            Error::ProviderRequest { .. }
                | Error::ProviderStatus { .. }
                | Error::ProviderMalformed { .. }
                | Error::ProviderEmpty { .. }
        )
    }

    /// Check if the error is fatal (process should exit)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::ConfigParse { .. }
                | Error::ConfigValidation { .. }
                | Error::CredentialsMissing { .. }
                | Error::BindFailed { .. }
                | Error::Internal(_)
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'backrooms config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'backrooms config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::CredentialsMissing { .. } => Some(
                "Set OPENAI_API_KEY or 'provider.api_key' in the configuration file."
            ),
            Error::BindFailed { .. } => Some(
                "Another process may be using the port. Change 'server.port' or stop the other process."
            ),
            Error::StorageWrite { .. } => Some(
                "Check that the directory holding 'ledger.path' exists and is writable."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            self.code().as_str(),
            self
        );

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config validation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a provider transport error
    pub fn provider_request(message: impl Into<String>) -> Self {
        Error::ProviderRequest {
            message: message.into(),
        }
    }

    /// Create a malformed provider response error
    pub fn provider_malformed(message: impl Into<String>) -> Self {
        Error::ProviderMalformed {
            message: message.into(),
        }
    }
}
