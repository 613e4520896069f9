use std::error::Error as _;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Clone, Error)]
pub enum PreviewError {
    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL scheme not allowed: {0}")]
    InvalidUrlScheme(String),

    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    #[error("Domain blocked: {0}")]
    DomainBlocked(String),

    #[error("Localhost addresses are blocked")]
    LocalhostBlocked,

    #[error("Private IP address blocked: {0}")]
    PrivateIpBlocked(String),

    #[error("Failed to fetch content: {0}")]
    FetchError(String),

    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Client error {status}: {message}")]
    ClientError { status: u16, message: String },

    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Failed to extract metadata: {0}")]
    ExtractError(String),

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("Content too large: {0} bytes")]
    ContentTooLarge(u64),

    #[error("Request timeout: {0}")]
    TimeoutError(String),

    #[error("Failed to open link: {0}")]
    NavigationError(String),
}

impl PreviewError {
    pub fn log(&self) {
        match self {
            PreviewError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            PreviewError::InvalidUrl(e) => {
                warn!(error = %e, "Invalid URL");
            }
            PreviewError::InvalidUrlScheme(scheme) => {
                warn!(scheme = %scheme, "URL scheme rejected");
            }
            PreviewError::DomainNotAllowed(host) | PreviewError::DomainBlocked(host) => {
                warn!(host = %host, "Domain rejected by policy");
            }
            PreviewError::LocalhostBlocked => {
                warn!("Localhost URL rejected");
            }
            PreviewError::PrivateIpBlocked(ip) => {
                warn!(ip = %ip, "Private IP rejected");
            }
            PreviewError::FetchError(e) => {
                error!(error = %e, "Content fetch failed");
            }
            PreviewError::ConnectionError(e) => {
                error!(error = %e, "Connection failed");
            }
            PreviewError::NotFound(e) => {
                warn!(error = %e, "Resource not found");
            }
            PreviewError::ClientError { status, message } => {
                warn!(status = *status, error = %message, "Client error response");
            }
            PreviewError::ServerError { status, message } => {
                error!(status = *status, error = %message, "Server error response");
            }
            PreviewError::ExtractError(e) => {
                error!(error = %e, "Metadata extraction failed");
            }
            PreviewError::InvalidContentType(e) => {
                warn!(error = %e, "Invalid content type received");
            }
            PreviewError::ContentTooLarge(size) => {
                warn!(size = *size, "Content exceeds size limit");
            }
            PreviewError::TimeoutError(e) => {
                warn!(error = %e, "Request timed out");
            }
            PreviewError::NavigationError(e) => {
                error!(error = %e, "Opening link failed");
            }
        }
    }

    /// Maps a reqwest failure onto the closest variant.
    pub fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        // A redirect policy rejection carries our own error as its source.
        if err.is_redirect() {
            if let Some(inner) = err
                .source()
                .and_then(|source| source.downcast_ref::<PreviewError>())
            {
                return inner.clone();
            }
        }

        if err.is_timeout() {
            PreviewError::TimeoutError(format!("{url}: {err}"))
        } else if err.is_connect() {
            PreviewError::ConnectionError(format!("{url}: {err}"))
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), url)
        } else {
            PreviewError::FetchError(err.to_string())
        }
    }

    pub fn from_status(status: u16, url: &str) -> Self {
        match status {
            404 => PreviewError::NotFound(format!("{url} not found")),
            400..=499 => PreviewError::ClientError {
                status,
                message: format!("request to {url} was rejected"),
            },
            500..=599 => PreviewError::ServerError {
                status,
                message: format!("{url} failed on the server"),
            },
            _ => PreviewError::FetchError(format!("unexpected status {status} for {url}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            PreviewError::from_status(404, "http://a.com"),
            PreviewError::NotFound(msg) if msg.contains("not found")
        ));
        assert!(matches!(
            PreviewError::from_status(403, "http://a.com"),
            PreviewError::ClientError { status: 403, .. }
        ));
        assert!(matches!(
            PreviewError::from_status(502, "http://a.com"),
            PreviewError::ServerError { status: 502, .. }
        ));
        assert!(matches!(
            PreviewError::from_status(302, "http://a.com"),
            PreviewError::FetchError(_)
        ));
    }
}
