//! Layer-scoped error taxonomy.
//!
//! Every failure in the fetch → decode → render pipeline is scoped to the
//! layer that produced it. None of these errors is retried automatically;
//! toggling the layer again is the retry path.

use thiserror::Error;

use crate::layer::LayerKind;

/// Result type alias using LayerError.
pub type LayerResult<T> = Result<T, LayerError>;

/// Errors surfaced for a single raster layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayerError {
    /// Network failure or non-2xx response while fetching raster bytes.
    ///
    /// `status` is `None` when no response was received at all.
    #[error("failed to fetch raster{}: {message}{}", fmt_status(.status), fmt_body(.body))]
    Fetch {
        status: Option<u16>,
        message: String,
        body: String,
    },

    /// The bytes are not a readable tagged-image raster container.
    #[error("malformed raster container: {0}")]
    Parse(String),

    /// The decoded band has no usable data.
    #[error("raster has no usable data: {0}")]
    EmptyRaster(String),

    /// No source URL exists for this layer at the current location.
    #[error("no {0} data available for this location")]
    Unavailable(LayerKind),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

fn fmt_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(". Details: {}", body)
    }
}

impl LayerError {
    /// A transport-level failure with no HTTP response.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Fetch {
            status: None,
            message: message.into(),
            body: String::new(),
        }
    }

    /// A non-2xx HTTP response, keeping the body for diagnostics.
    pub fn http(status: u16, message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Fetch {
            status: Some(status),
            message: message.into(),
            body: body.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn empty(msg: impl Into<String>) -> Self {
        Self::EmptyRaster(msg.into())
    }

    /// Whether re-triggering the layer has a reasonable chance of succeeding.
    ///
    /// Informational only: nothing in this workspace retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            LayerError::Fetch { status: None, .. } => true,
            LayerError::Fetch {
                status: Some(code), ..
            } => *code >= 500 || *code == 429,
            _ => false,
        }
    }

    /// Short machine-readable code, used as a metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            LayerError::Fetch { .. } => "fetch",
            LayerError::Parse(_) => "parse",
            LayerError::EmptyRaster(_) => "empty_raster",
            LayerError::Unavailable(_) => "unavailable",
        }
    }

    /// Message shown to the user next to the map.
    pub fn user_message(&self, label: &str) -> String {
        format!("Could not display {} overlay: {}", label, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display_includes_status_and_body() {
        let err = LayerError::http(403, "Forbidden", "API key not valid");
        let msg = err.to_string();
        assert!(msg.contains("HTTP 403"));
        assert!(msg.contains("Forbidden"));
        assert!(msg.contains("API key not valid"));
    }

    #[test]
    fn test_network_error_display() {
        let err = LayerError::network("connection reset");
        assert_eq!(err.to_string(), "failed to fetch raster: connection reset");
    }

    #[test]
    fn test_retryable() {
        assert!(LayerError::network("timeout").is_retryable());
        assert!(LayerError::http(503, "Service Unavailable", "").is_retryable());
        assert!(!LayerError::http(404, "Not Found", "").is_retryable());
        assert!(!LayerError::parse("bad magic").is_retryable());
        assert!(!LayerError::Unavailable(LayerKind::BuildingMask).is_retryable());
    }

    #[test]
    fn test_user_message() {
        let err = LayerError::Unavailable(LayerKind::HourlyShade);
        assert_eq!(
            err.user_message("Hourly Shade (Dec)"),
            "Could not display Hourly Shade (Dec) overlay: no hourly_shade data available for this location"
        );
    }
}
