use crate::lifecycle::{Lifecycle, LifecycleGuard};
use crate::navigation::LinkOpener;
use crate::resolver::{PreviewResolver, ResolverConfig};
use crate::security::normalize_target;
use crate::url_extractor::extract_url;
use crate::{MetadataFetcher, PreviewError, PreviewObserver, PreviewRequest, ResolvedPreview};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// The unit that owns one preview: it resolves text as it changes, exposes the
/// state to the renderer and opens the link when pressed.
///
/// A session starts inactive. Results that land before [`activate`](Self::activate)
/// or after [`teardown`](Self::teardown) are discarded. Dropping the session
/// tears it down.
pub struct PreviewSession {
    resolver: PreviewResolver,
    observer: Arc<dyn PreviewObserver>,
    opener: Arc<dyn LinkOpener>,
    target: watch::Sender<Option<String>>,
}

impl PreviewSession {
    /// Builds the session and immediately starts resolving `initial`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        fetcher: Arc<dyn MetadataFetcher>,
        observer: Arc<dyn PreviewObserver>,
        opener: Arc<dyn LinkOpener>,
        config: ResolverConfig,
        initial: PreviewRequest,
    ) -> (Self, Option<JoinHandle<()>>) {
        let guard = Arc::new(LifecycleGuard::new(config.supersede_policy));
        let (target, _) = watch::channel(None);
        let session = Self {
            resolver: PreviewResolver::new(fetcher, guard, config),
            observer,
            opener,
            target,
        };
        let pending = session.update(initial);
        (session, pending)
    }

    pub fn activate(&self) -> bool {
        self.resolver.guard().activate()
    }

    pub fn teardown(&self) -> bool {
        self.resolver.guard().teardown()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.resolver.guard().lifecycle()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolvedPreview> {
        self.resolver.guard().subscribe()
    }

    pub fn snapshot(&self) -> ResolvedPreview {
        self.resolver.guard().snapshot()
    }

    /// Re-resolves after the text changed. Absent text clears the preview
    /// without touching the observer.
    pub fn update(&self, request: PreviewRequest) -> Option<JoinHandle<()>> {
        self.target
            .send_replace(extract_url(request.text.as_deref()).map(str::to_string));

        if request.text.is_none() {
            let guard = self.resolver.guard();
            let seq = guard.next_sequence();
            guard.write(seq, ResolvedPreview::empty());
            return None;
        }

        self.resolver.resolve(request, Arc::clone(&self.observer))
    }

    /// URL extracted from the most recent text, as written there.
    pub fn target_url(&self) -> Option<String> {
        self.target.borrow().clone()
    }

    /// Handles a press on the rendered preview.
    ///
    /// Returns `Ok(false)` when nothing is shown. Otherwise the observer's
    /// `on_press` runs first, then the link is opened.
    pub fn press(&self) -> Result<bool, PreviewError> {
        if !self.snapshot().has_preview {
            return Ok(false);
        }
        let Some(target) = self.target_url() else {
            return Ok(false);
        };

        self.observer.on_press();
        let url = normalize_target(&target)?;
        debug!(url = %url, "Preview pressed");
        self.opener.open(url.as_str()).inspect_err(|e| e.log())?;
        Ok(true)
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
