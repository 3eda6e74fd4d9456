//! Error types for the OGC client crates.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using OgcError.
pub type OgcResult<T> = Result<T, OgcError>;

/// Primary error type for OGC client operations.
///
/// Payloads are owned strings so the error is `Clone`: a failed capabilities
/// fetch is memoized and handed to every caller awaiting it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OgcError {
    // === Request construction ===
    #[error("Malformed URL '{url}': {message}")]
    MalformedUrl { url: String, message: String },

    #[error("Malformed extent: {0}")]
    MalformedExtent(String),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    // === Capabilities ===
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Layer '{0}' has no time dimension")]
    NoTimeDimension(String),

    #[error("Operation not supported: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid XML: {0}")]
    Xml(String),

    #[error("Invalid JSON: {0}")]
    Json(String),

    #[error("Service exception ({code}): {message}")]
    ServiceException { code: String, message: String },

    // === Transport ===
    #[error("Capabilities request to {url} failed with HTTP {status}")]
    CapabilitiesFetch { status: u16, url: String },

    #[error("Image request to {url} failed with HTTP {status}")]
    ImageFetch { status: u16, url: String },

    #[error("Feature request to {url} failed with HTTP {status}")]
    FeatureFetch { status: u16, url: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    // === Configuration ===
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl OgcError {
    /// Build a `MalformedUrl` error.
    pub fn malformed_url(url: impl Into<String>, message: impl ToString) -> Self {
        OgcError::MalformedUrl {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            OgcError::CapabilitiesFetch { status, .. }
            | OgcError::ImageFetch { status, .. }
            | OgcError::FeatureFetch { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a fresh attempt could succeed without changing the request.
    ///
    /// The client itself never retries; this is for callers deciding whether
    /// to rebuild a client or call `refresh`.
    pub fn is_retryable(&self) -> bool {
        match self {
            OgcError::Timeout(_) | OgcError::Transport(_) => true,
            OgcError::CapabilitiesFetch { status, .. }
            | OgcError::ImageFetch { status, .. }
            | OgcError::FeatureFetch { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// OGC exception code matching this error, as used in exception reports.
    pub fn ogc_exception_code(&self) -> &str {
        match self {
            OgcError::ServiceException { code, .. } => code,
            OgcError::LayerNotFound(_) => "LayerNotDefined",
            OgcError::MalformedExtent(_) => "InvalidBBox",
            OgcError::UnsupportedCrs(_) => "InvalidCRS",
            OgcError::InvalidTime(_) | OgcError::NoTimeDimension(_) => "InvalidDimensionValue",
            OgcError::UnsupportedOperation(_) => "OperationNotSupported",
            _ => "NoApplicableCode",
        }
    }
}

impl From<serde_json::Error> for OgcError {
    fn from(err: serde_json::Error) -> Self {
        OgcError::Json(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code() {
        let err = OgcError::ImageFetch {
            status: 404,
            url: "https://example.com/wms".to_string(),
        };
        assert_eq!(err.status_code(), Some(404));
        assert!(!err.is_retryable());

        assert_eq!(OgcError::LayerNotFound("x".into()).status_code(), None);
    }

    #[test]
    fn test_retryable() {
        assert!(OgcError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(OgcError::CapabilitiesFetch {
            status: 503,
            url: String::new()
        }
        .is_retryable());
        assert!(!OgcError::MalformedExtent("bad".into()).is_retryable());
    }

    #[test]
    fn test_exception_codes() {
        assert_eq!(
            OgcError::LayerNotFound("a".into()).ogc_exception_code(),
            "LayerNotDefined"
        );
        let err = OgcError::ServiceException {
            code: "InvalidFormat".into(),
            message: "nope".into(),
        };
        assert_eq!(err.ogc_exception_code(), "InvalidFormat");
        assert_eq!(
            OgcError::Transport("reset".into()).ogc_exception_code(),
            "NoApplicableCode"
        );
    }
}
