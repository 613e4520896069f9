use crate::extractor::MetadataExtractor;
use crate::security::{UrlValidationConfig, UrlValidator};
use crate::{MetadataFetcher, PreviewError, RawMetadata};
use async_trait::async_trait;
use reqwest::{header, header::HeaderMap, redirect, Client};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// HTTP-backed [`MetadataFetcher`]: downloads the page and extracts its
/// preview metadata.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    validator: UrlValidator,
    extractor: MetadataExtractor,
    max_content_size: u64,
}

/// Creates a fetcher with custom configuration.
///
/// # Examples
/// ```ignore
/// let fetcher = Fetcher::new_with_config(FetcherConfig {
///     user_agent: "my-custom-agent/1.0".to_string(),
///     timeout: Duration::from_secs(20),
///     ..Default::default()
/// })?;
/// ```
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub headers: Option<HeaderMap>,
    /// Policy applied to the requested URL and to every redirect hop.
    pub url_validation: UrlValidationConfig,
    pub max_redirects: usize,
    pub max_content_size: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "text_url_preview/0.1.0".to_string(),
            timeout: Duration::from_secs(10),
            headers: None,
            url_validation: UrlValidationConfig::default(),
            max_redirects: 10,
            max_content_size: 10 * 1024 * 1024,
        }
    }
}

// Follows redirects only while each hop still passes the URL policy.
fn redirect_policy(validator: UrlValidator, max_redirects: usize) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= max_redirects {
            return attempt.error(PreviewError::FetchError(format!(
                "too many redirects (limit {max_redirects})"
            )));
        }
        match validator.validate(attempt.url().as_str()) {
            Ok(_) => attempt.follow(),
            Err(e) => {
                warn!(target_url = %attempt.url(), error = %e, "Redirect rejected by URL policy");
                attempt.error(e)
            }
        }
    })
}

impl Fetcher {
    pub fn new() -> Result<Self, PreviewError> {
        debug!("Fetcher initialized with default configuration");
        Self::new_with_config(FetcherConfig::default())
    }

    pub fn new_with_config(config: FetcherConfig) -> Result<Self, PreviewError> {
        let validator = UrlValidator::new(config.url_validation);

        let mut client_builder = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .pool_max_idle_per_host(10)
            .redirect(redirect_policy(validator.clone(), config.max_redirects));

        if let Some(headers) = config.headers {
            client_builder = client_builder.default_headers(headers);
        }

        let client = client_builder.build().map_err(|e| {
            error!(error = %e, "Failed to create HTTP client");
            PreviewError::FetchError(format!("Failed to initialize HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            validator,
            extractor: MetadataExtractor::new(),
            max_content_size: config.max_content_size,
        })
    }

    /// Wraps a prebuilt client. Redirect hops are then governed by the
    /// client's own redirect policy; only the initial URL is validated.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            validator: UrlValidator::with_default_config(),
            extractor: MetadataExtractor::new(),
            max_content_size: FetcherConfig::default().max_content_size,
        }
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_metadata(&self, raw_url: &str) -> Result<RawMetadata, PreviewError> {
        let url = self.validator.validate(raw_url)?;
        debug!(url = %url, "Starting fetch request");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| PreviewError::from_reqwest(e, url.as_str()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::from_status(status.as_u16(), url.as_str()));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_content_size {
                return Err(PreviewError::ContentTooLarge(length));
            }
        }

        // Redirects may have moved us; relative links resolve against the final page.
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_ascii_lowercase();

        match media_kind(&content_type) {
            Some(MediaKind::Html) => {
                let body = self.read_body(response, &final_url).await?;
                debug!(url = %final_url, content_length = body.len(), "Successfully fetched webpage");
                self.extractor.extract(&body, &final_url)
            }
            Some(MediaKind::Image) => Ok(RawMetadata {
                url: Some(final_url.clone()),
                media_type: Some("image".to_string()),
                images: vec![final_url],
                ..Default::default()
            }),
            Some(MediaKind::Other(kind)) => Ok(RawMetadata {
                url: Some(final_url),
                media_type: Some(kind.to_string()),
                ..Default::default()
            }),
            None => Err(PreviewError::InvalidContentType(content_type)),
        }
    }

    /// Streams the body, giving up as soon as it grows past `max_content_size`.
    async fn read_body(
        &self,
        mut response: reqwest::Response,
        url: &str,
    ) -> Result<String, PreviewError> {
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| PreviewError::from_reqwest(e, url))?
        {
            let total = (body.len() + chunk.len()) as u64;
            if total > self.max_content_size {
                return Err(PreviewError::ContentTooLarge(total));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl MetadataFetcher for Fetcher {
    async fn fetch(&self, url: &str) -> Result<RawMetadata, PreviewError> {
        self.fetch_metadata(url).await
    }
}

#[derive(Debug, PartialEq, Eq)]
enum MediaKind {
    Html,
    Image,
    Other(&'static str),
}

fn media_kind(content_type: &str) -> Option<MediaKind> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    if mime == "text/html" || mime == "application/xhtml+xml" {
        Some(MediaKind::Html)
    } else if mime.starts_with("image/") {
        Some(MediaKind::Image)
    } else if mime.starts_with("audio/") {
        Some(MediaKind::Other("audio"))
    } else if mime.starts_with("video/") {
        Some(MediaKind::Other("video"))
    } else if mime.starts_with("application/") {
        Some(MediaKind::Other("application"))
    } else {
        None
    }
}
