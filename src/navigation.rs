use crate::PreviewError;
use tracing::debug;

/// Hands a resolved link to whatever should display it.
pub trait LinkOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<(), PreviewError>;
}

/// Opens links with the platform's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl LinkOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<(), PreviewError> {
        debug!(url = %url, "Opening link with system handler");
        webbrowser::open(url).map_err(|e| PreviewError::NavigationError(format!("{url}: {e}")))
    }
}

/// For headless callers that only want the preview state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOpener;

impl LinkOpener for NoopOpener {
    fn open(&self, url: &str) -> Result<(), PreviewError> {
        debug!(url = %url, "Ignoring link open request");
        Ok(())
    }
}
