use crate::config::Method;
use thiserror::Error;

/// Result type for remote-control operations
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors that can occur when selecting a protocol or talking to a TV
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Discovery found nothing and no host was configured
    #[error("No TV found")]
    NoTvFound,

    /// An explicit host was configured but no protocol rule matched it
    #[error("Unable to determine a remote-control method for the configured TV")]
    ConfigUnknownMethod,

    /// Selection or binding broke an internal invariant; this is a bug
    #[error("Internal error: {0}")]
    Internal(String),

    /// The backend factory has no engine for this method
    #[error("No backend available for method {0}")]
    UnsupportedMethod(Method),

    /// A proxied attribute was read while no device descriptor is attached
    #[error("No device descriptor attached to this session")]
    NoDescriptor,

    /// The attribute name belongs to the session itself and is never proxied
    #[error("Attribute {0:?} is reserved by the session")]
    ReservedAttribute(String),

    /// A descriptor attribute was assigned a value of the wrong shape
    #[error("Invalid value for attribute {name:?}: {reason}")]
    InvalidAttribute {
        /// Attribute name
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// MAC address could not be parsed into six bytes
    #[error("Invalid MAC address: {0:?}")]
    InvalidMacAddress(String),

    /// Configuration is structurally unusable for the chosen backend
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The TV refused the pairing request
    #[error("Unauthorized by TV")]
    Unauthorized,

    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// TLS connector setup error
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// Connection was closed unexpectedly
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation requires an open connection
    #[error("Not connected")]
    NotConnected,

    /// Request timed out waiting for response
    #[error("Request timeout")]
    Timeout,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unexpected response from the TV
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Error raised by a caller-supplied backend
    #[error("Backend error: {0}")]
    Backend(String),
}
