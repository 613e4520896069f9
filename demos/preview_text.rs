use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use text_url_preview::{
    extract_urls, log_error_card, log_preview_card, setup_logging, FailurePolicy, Fetcher,
    LogConfig, NoopOpener, PreviewError, PreviewObserver, PreviewRequest, PreviewSession,
    RawMetadata, ResolverConfig, SystemOpener,
};

/// Resolve the first link in a piece of text and print its preview card.
#[derive(Parser, Debug)]
#[command(name = "preview_text")]
struct Args {
    /// Free text that may contain a link.
    text: String,

    /// JSON metadata to show when the fetch fails, e.g. '{"title":"Offline"}'.
    #[arg(long)]
    fallback: Option<String>,

    /// Clear the preview instead of keeping it when a fetch fails without fallback.
    #[arg(long)]
    clear_on_failure: bool,

    /// Give up on the fetch after this many seconds.
    #[arg(long, default_value_t = 15)]
    timeout: u64,

    /// Open the link in the system browser once resolved.
    #[arg(long)]
    open: bool,
}

struct CardObserver {
    url: String,
}

impl PreviewObserver for CardObserver {
    fn on_link_loaded(&self, data: &RawMetadata) {
        println!(
            "loaded {} image candidates, {} favicons",
            data.images.len(),
            data.favicons.len()
        );
    }

    fn on_link_failed(&self, error: &PreviewError) {
        log_error_card(&self.url, error);
    }

    fn on_press(&self) {
        println!("opening {}", self.url);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    setup_logging(LogConfig {
        file_output: false,
        log_level: "text_url_preview=debug".into(),
        ..Default::default()
    })?;

    let mut urls = extract_urls(&args.text);
    let Some(url) = urls.next().map(str::to_string) else {
        println!("no link found");
        return Ok(());
    };
    let ignored: Vec<_> = urls.collect();
    if !ignored.is_empty() {
        println!("ignoring later links: {}", ignored.join(", "));
    }

    let mut request = PreviewRequest::new(args.text.clone());
    if let Some(json) = &args.fallback {
        request = request.with_default_data(RawMetadata::from_json(json)?);
    }

    let mut config = ResolverConfig::new().with_fetch_timeout(Duration::from_secs(args.timeout));
    if args.clear_on_failure {
        config = config.with_failure_policy(FailurePolicy::Clear);
    }

    let opener: Arc<dyn text_url_preview::LinkOpener> = if args.open {
        Arc::new(SystemOpener)
    } else {
        Arc::new(NoopOpener)
    };

    let (session, _) = PreviewSession::new(
        Arc::new(Fetcher::new()?),
        Arc::new(CardObserver { url: url.clone() }),
        opener,
        config,
        PreviewRequest::default(),
    );
    session.activate();

    if let Some(pending) = session.update(request) {
        pending.await?;
    }

    log_preview_card(&session.snapshot(), &url);
    if args.open {
        session.press()?;
    }

    session.teardown();
    Ok(())
}
