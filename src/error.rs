//! # Error Types Module
//!
//! Centralized error handling for the VISUM kiosk client.
//! Every error ends up as a human-readable banner in the UI, so each variant
//! carries enough context to produce a useful `Display` string.
//!
//! ## Error Types
//! - `ClientError`: HTTP transport, status and payload failures talking to the backend
//! - `ConfigError`: Configuration file I/O and parsing errors
//! - `TrackerError`: Device tracker runtime failures
//!
//! ## Usage Examples
//! ```rust
//! // Config module uses ConfigError
//! pub fn load() -> Result<Config, ConfigError> { ... }
//!
//! // Backend client uses ClientError
//! pub async fn scan_bluetooth(&self) -> Result<ScanOutcome, ClientError> { ... }
//! ```

use std::fmt;

/// Errors that can occur while talking to the VISUM backend
#[derive(Debug)]
pub enum ClientError {
    /// Request never produced a response (connection refused, timeout, ...)
    Transport(reqwest::Error),
    /// Backend answered with a non-2xx status
    Status { endpoint: String, status: u16 },
    /// Response body did not have the expected shape
    Decode { endpoint: String, reason: String },
    /// Backend reported a failure in its own payload (`success: false`)
    Backend(String),
    /// Configured server address cannot be used as a base URL
    InvalidAddress(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(e) => {
                write!(f, "Could not reach the server: {}", e)
            }
            ClientError::Status { endpoint, status } => {
                write!(f, "Server returned status {} for {}", status, endpoint)
            }
            ClientError::Decode { endpoint, reason } => {
                write!(f, "Unexpected response from {}: {}", endpoint, reason)
            }
            ClientError::Backend(msg) => {
                write!(f, "{}", msg)
            }
            ClientError::InvalidAddress(addr) => {
                write!(f, "Invalid server address: {}", addr)
            }
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e)
    }
}

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read config file
    ReadFailed(std::io::Error),
    /// Failed to write config file
    WriteFailed(std::io::Error),
    /// Failed to parse config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize config
    SerializeFailed(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed(e) => {
                write!(f, "Failed to read config file: {}", e)
            }
            ConfigError::WriteFailed(e) => {
                write!(f, "Failed to write config file: {}", e)
            }
            ConfigError::ParseFailed(e) => {
                write!(f, "Failed to parse config file: {}", e)
            }
            ConfigError::SerializeFailed(e) => {
                write!(f, "Failed to serialize config: {}", e)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed(e) => Some(e),
            ConfigError::WriteFailed(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
        }
    }
}

/// Errors that can occur while starting the device tracker
#[derive(Debug)]
pub enum TrackerError {
    /// Failed to create Tokio runtime
    RuntimeCreation(String),
    /// Failed to build the HTTP client
    ClientSetup(String),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::RuntimeCreation(msg) => {
                write!(f, "Failed to create async runtime: {}", msg)
            }
            TrackerError::ClientSetup(msg) => {
                write!(f, "Failed to set up backend client: {}", msg)
            }
        }
    }
}

impl std::error::Error for TrackerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ClientError::Status {
            endpoint: "/data/scan_bluetooth".to_string(),
            status: 503,
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("/data/scan_bluetooth"));
    }

    #[test]
    fn test_backend_error_is_passed_through() {
        let err = ClientError::Backend("no such device".to_string());
        assert_eq!(err.to_string(), "no such device");
    }

    #[test]
    fn test_config_error_chain() {
        use std::error::Error;
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::ReadFailed(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_tracker_error_display() {
        let err = TrackerError::RuntimeCreation("boom".to_string());
        assert!(err.to_string().contains("runtime"));
    }
}
