use crate::lifecycle::LifecycleGuard;
use crate::url_extractor::extract_url;
use crate::{MetadataFetcher, PreviewError, PreviewObserver, PreviewRequest, RawMetadata, ResolvedPreview};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

/// What happens to an attempt's result once a newer attempt has been issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SupersedePolicy {
    /// Only the most recently issued attempt may write.
    #[default]
    LatestRequest,
    /// Every attempt writes when it completes; the slowest one wins.
    LastCompletion,
}

/// State written when a fetch fails and the request has no fallback payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Leave whatever the preview last showed.
    #[default]
    KeepLast,
    /// Reset to the no-preview state.
    Clear,
}

#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    pub supersede_policy: SupersedePolicy,
    pub failure_policy: FailurePolicy,
    pub fetch_timeout: Option<Duration>,
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_supersede_policy(mut self, policy: SupersedePolicy) -> Self {
        self.supersede_policy = policy;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }
}

/// Turns text into preview state: extract, fetch, select, then write through
/// the [`LifecycleGuard`].
#[derive(Clone)]
pub struct PreviewResolver {
    fetcher: Arc<dyn MetadataFetcher>,
    guard: Arc<LifecycleGuard>,
    config: ResolverConfig,
}

impl PreviewResolver {
    pub fn new(
        fetcher: Arc<dyn MetadataFetcher>,
        guard: Arc<LifecycleGuard>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            fetcher,
            guard,
            config,
        }
    }

    pub fn guard(&self) -> &Arc<LifecycleGuard> {
        &self.guard
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Starts one resolution attempt.
    ///
    /// Text without a URL writes the no-preview state right away and returns
    /// `None`. Otherwise the fetch runs on a spawned task whose handle is
    /// returned; the caller may await it or drop it. Must be called from within
    /// a Tokio runtime.
    #[instrument(level = "debug", skip_all)]
    pub fn resolve(
        &self,
        request: PreviewRequest,
        observer: Arc<dyn PreviewObserver>,
    ) -> Option<JoinHandle<()>> {
        let seq = self.guard.next_sequence();

        let url = match extract_url(request.text.as_deref()) {
            Some(url) => url.to_string(),
            None => {
                debug!(seq, "No URL found in text");
                self.guard.write(seq, ResolvedPreview::empty());
                return None;
            }
        };

        debug!(seq, url = %url, "Resolving preview");
        let resolver = self.clone();
        let default_data = request.default_data;
        Some(tokio::spawn(async move {
            resolver
                .run_attempt(seq, &url, default_data, observer.as_ref())
                .await;
        }))
    }

    async fn run_attempt(
        &self,
        seq: u64,
        url: &str,
        default_data: Option<RawMetadata>,
        observer: &dyn PreviewObserver,
    ) {
        match self.fetch(url).await {
            Ok(data) => {
                observer.on_link_loaded(&data);
                let applied = self.guard.write(seq, ResolvedPreview::from_metadata(&data));
                debug!(seq, url = %url, applied, "Preview loaded");
            }
            Err(e) => {
                e.log();
                observer.on_link_failed(&e);
                match default_data {
                    Some(fallback) => {
                        let applied = self.guard.write(seq, ResolvedPreview::from_fallback(&fallback));
                        debug!(seq, url = %url, applied, "Using fallback preview");
                    }
                    None => match self.config.failure_policy {
                        FailurePolicy::KeepLast => {
                            debug!(seq, url = %url, "No fallback, keeping previous preview");
                        }
                        FailurePolicy::Clear => {
                            self.guard.write(seq, ResolvedPreview::empty());
                        }
                    },
                }
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<RawMetadata, PreviewError> {
        match self.config.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetcher.fetch(url))
                .await
                .map_err(|_| {
                    PreviewError::TimeoutError(format!("{url} did not resolve within {limit:?}"))
                })?,
            None => self.fetcher.fetch(url).await,
        }
    }
}
