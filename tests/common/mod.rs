#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use text_url_preview::{LinkOpener, MetadataFetcher, PreviewError, PreviewObserver, RawMetadata};
use tokio::sync::oneshot;

pub type Outcome = Result<RawMetadata, String>;

enum Route {
    Ready(Outcome),
    Gated(oneshot::Receiver<Outcome>),
}

/// Fetcher whose answers are scripted per URL. Gated routes only answer once
/// the test sends the outcome, which lets tests pick completion order.
#[derive(Default)]
pub struct MockFetcher {
    routes: Mutex<HashMap<String, Route>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, data: RawMetadata) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Ready(Ok(data)));
    }

    pub fn fail(&self, url: &str, message: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Ready(Err(message.to_string())));
    }

    pub fn gate(&self, url: &str) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Gated(rx));
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<RawMetadata, PreviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let route = {
            let mut routes = self.routes.lock().unwrap();
            if matches!(routes.get(url), Some(Route::Gated(_))) {
                routes.remove(url).unwrap()
            } else {
                match routes.get(url) {
                    Some(Route::Ready(outcome)) => Route::Ready(outcome.clone()),
                    _ => Route::Ready(Err(format!("no route for {url}"))),
                }
            }
        };

        let outcome = match route {
            Route::Ready(outcome) => outcome,
            Route::Gated(rx) => rx.await.unwrap_or_else(|_| Err("gate dropped".to_string())),
        };
        outcome.map_err(PreviewError::FetchError)
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub loaded: Mutex<Vec<RawMetadata>>,
    pub failed: Mutex<Vec<String>>,
    pub presses: AtomicUsize,
}

impl RecordingObserver {
    pub fn loaded_count(&self) -> usize {
        self.loaded.lock().unwrap().len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.lock().unwrap().len()
    }

    pub fn press_count(&self) -> usize {
        self.presses.load(Ordering::SeqCst)
    }
}

impl PreviewObserver for RecordingObserver {
    fn on_link_loaded(&self, data: &RawMetadata) {
        self.loaded.lock().unwrap().push(data.clone());
    }

    fn on_link_failed(&self, error: &PreviewError) {
        self.failed.lock().unwrap().push(error.to_string());
    }

    fn on_press(&self) {
        self.presses.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingOpener {
    pub opened: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingOpener {
    pub fn failing() -> Self {
        Self {
            opened: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl LinkOpener for RecordingOpener {
    fn open(&self, url: &str) -> Result<(), PreviewError> {
        self.opened.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(PreviewError::NavigationError("no handler".to_string()));
        }
        Ok(())
    }
}

pub fn metadata(title: &str, images: &[&str], favicons: &[&str]) -> RawMetadata {
    RawMetadata {
        title: Some(title.to_string()),
        images: images.iter().map(|s| s.to_string()).collect(),
        favicons: favicons.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}
