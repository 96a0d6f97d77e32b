//! Error types for the DDNS updater
//!
//! The variants follow the scope at which a failure is handled:
//! configuration errors stop a run before any network activity, detection
//! errors only disable one address family, zone errors skip one domain and
//! everything else is confined to a single (domain, record type) pair.

use crate::record::IpFamily;
use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS updater
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration failed validation
    #[error("configuration validation failed: {0}")]
    ConfigInvalid(String),

    /// No echo service returned a usable address for this family
    #[error("failed to get {family} address from all services")]
    Detection {
        /// Address family that could not be detected
        family: IpFamily,
    },

    /// Zone lookup returned no match
    #[error("zone not found for domain {0}")]
    ZoneNotFound(String),

    /// First error reported by the provider in a failed envelope
    #[error("cloudflare API error: {message} (code: {code})")]
    Provider {
        /// Provider error code
        code: i64,
        /// Provider error message
        message: String,
    },

    /// Provider reported failure without any error entry
    #[error("cloudflare API request failed")]
    ProviderFailed,

    /// Record creation failed
    #[error("failed to create record: {0}")]
    CreateFailed(#[source] Box<Error>),

    /// Record update failed
    #[error("failed to update record: {0}")]
    UpdateFailed(#[source] Box<Error>),

    /// Transport errors, timeouts and unexpected HTTP statuses
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body was not a provider envelope
    #[error("failed to parse response: {0}")]
    Envelope(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem errors while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigInvalid(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an envelope parse error
    pub fn envelope(msg: impl Into<String>) -> Self {
        Self::Envelope(msg.into())
    }

    /// Create a provider error from a reported code and message
    pub fn provider(code: i64, message: impl Into<String>) -> Self {
        Self::Provider {
            code,
            message: message.into(),
        }
    }

    /// The provider `(code, message)` behind this error, if any
    ///
    /// Looks through `CreateFailed`/`UpdateFailed` wrappers.
    pub fn provider_error(&self) -> Option<(i64, &str)> {
        match self {
            Self::Provider { code, message } => Some((*code, message.as_str())),
            Self::CreateFailed(inner) | Self::UpdateFailed(inner) => inner.provider_error(),
            _ => None,
        }
    }

    /// Whether this error should abort the whole run
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::ConfigInvalid(_))
    }
}
