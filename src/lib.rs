use async_trait::async_trait;

mod error;
mod extractor;
mod fetcher;
mod lifecycle;
#[cfg(feature = "logging")]
mod logging;
mod navigation;
mod resolver;
mod security;
mod selector;
mod session;
mod url_extractor;
#[cfg(feature = "logging")]
mod utils;

pub use error::PreviewError;
pub use extractor::MetadataExtractor;
pub use fetcher::{Fetcher, FetcherConfig};
pub use lifecycle::{Lifecycle, LifecycleGuard};
#[cfg(feature = "logging")]
pub use logging::{log_error_card, log_preview_card, setup_logging, LogConfig, LogLevelGuard};
pub use navigation::{LinkOpener, NoopOpener, SystemOpener};
pub use resolver::{FailurePolicy, PreviewResolver, ResolverConfig, SupersedePolicy};
pub use security::{normalize_target, UrlValidationConfig, UrlValidator};
pub use selector::{non_empty, select_favicon, select_image};
pub use session::PreviewSession;
pub use url_extractor::{extract_url, extract_urls};

/// Metadata describing a link, as returned by a [`MetadataFetcher`] or
/// supplied by the caller as a fallback.
///
/// Every field defaults, so a partial fallback payload deserializes with the
/// missing parts treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RawMetadata {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub media_type: Option<String>,
    pub images: Vec<String>,
    pub favicons: Vec<String>,
}

impl RawMetadata {
    /// Parses a fallback payload. Unknown fields are ignored and missing ones are absent.
    pub fn from_json(json: &str) -> Result<Self, PreviewError> {
        serde_json::from_str(json)
            .map_err(|e| PreviewError::ExtractError(format!("Invalid metadata payload: {e}")))
    }
}

/// Input to one resolution attempt.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PreviewRequest {
    pub text: Option<String>,
    pub default_data: Option<RawMetadata>,
}

impl PreviewRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            default_data: None,
        }
    }

    pub fn with_default_data(mut self, default_data: RawMetadata) -> Self {
        self.default_data = Some(default_data);
        self
    }
}

/// Render-ready preview state. When `has_preview` is false the other fields
/// carry no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResolvedPreview {
    pub has_preview: bool,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub favicon: Option<String>,
}

impl ResolvedPreview {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The picture a card shows: the image when there is one, otherwise the favicon.
    pub fn thumbnail(&self) -> Option<&str> {
        self.image.as_deref().or(self.favicon.as_deref())
    }
}

/// Upstream collaborator resolving a URL into [`RawMetadata`].
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RawMetadata, PreviewError>;
}

/// Notification hooks fired by the resolver and the session.
///
/// All methods default to doing nothing.
pub trait PreviewObserver: Send + Sync {
    fn on_link_loaded(&self, _data: &RawMetadata) {}

    fn on_link_failed(&self, _error: &PreviewError) {}

    /// Runs right before the link is handed to the [`LinkOpener`].
    fn on_press(&self) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PreviewObserver for NoopObserver {}
