use crate::utils::truncate_str;
use crate::ResolvedPreview;
use std::fmt::Display;
use std::io;
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Debug)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub log_level: String,
    pub console_output: bool,
    pub file_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            log_level: "info".into(),
            console_output: true,
            file_output: true,
        }
    }
}

fn wrap_text(text: &str, width: usize) -> String {
    let mut wrapped = String::new();
    let mut line_length = 0;

    for word in text.split_whitespace() {
        if line_length > 0 && line_length + word.len() + 1 > width {
            wrapped.push_str("\n  ");
            line_length = 2;
        } else if line_length > 0 {
            wrapped.push(' ');
            line_length += 1;
        }
        wrapped.push_str(word);
        line_length += word.len();
    }
    wrapped
}

/// Logs the state a renderer would show for `url` as a boxed card.
pub fn log_preview_card(preview: &ResolvedPreview, url: &str) {
    const CARD_WIDTH: usize = 80;
    const CONTENT_WIDTH: usize = CARD_WIDTH - 2;

    let horizontal_line = "═".repeat(CARD_WIDTH - 2);

    if !preview.has_preview {
        info!(
            "\n╔{}╗\n URL: {}\n (no preview)\n╚{}╝",
            horizontal_line,
            wrap_text(url, CONTENT_WIDTH - 5),
            horizontal_line,
        );
        return;
    }

    info!(
        "\n╔{}╗\n\
         URL: {}\n\
         Title: {}\n\
         Desc: {}\n\
         Image: {}\n\
         Icon: {}\n\
         ╚{}╝",
        horizontal_line,
        wrap_text(url, CONTENT_WIDTH - 5),
        wrap_text(preview.title.as_deref().unwrap_or("N/A"), CONTENT_WIDTH - 7),
        wrap_text(preview.description.as_deref().unwrap_or("N/A"), CONTENT_WIDTH - 6),
        wrap_text(preview.image.as_deref().unwrap_or("N/A"), CONTENT_WIDTH - 7),
        wrap_text(preview.favicon.as_deref().unwrap_or("N/A"), CONTENT_WIDTH - 6),
        horizontal_line,
    );
}

pub fn log_error_card<E: Display + std::error::Error>(url: &str, error: &E) {
    const CARD_WIDTH: usize = 70;
    const CONTENT_WIDTH: usize = CARD_WIDTH - 8;

    let top_bottom = "═".repeat(CARD_WIDTH - 2);
    let middle = "─".repeat(CARD_WIDTH - 2);

    let mut error_details = error.to_string();
    if let Some(source) = error.source() {
        error_details = format!("{error_details} (caused by: {source})");
    }

    error!(
        "\n╔═{}═╗\n\
         ║ URL: {:<width$} ║\n\
         ║{}║\n\
         ║ Error: {:<width$} ║\n\
         ╚═{}═╝",
        top_bottom,
        truncate_str(url, CONTENT_WIDTH),
        middle,
        truncate_str(&error_details, CONTENT_WIDTH),
        top_bottom,
        width = CONTENT_WIDTH
    );
}

/// Installs the global subscriber: a pretty console layer and/or a daily
/// rolling file under `log_dir`. `RUST_LOG` overrides `log_level`.
pub fn setup_logging(config: LogConfig) -> io::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let mut layers = Vec::new();

    if config.console_output {
        let console_layer = subscriber_fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .pretty();
        layers.push(console_layer.boxed());
    }

    if config.file_output {
        std::fs::create_dir_all(&config.log_dir)?;

        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "text-url-preview.log");

        let file_layer = subscriber_fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .with_writer(file_appender);

        layers.push(file_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| io::Error::other(format!("Failed to set global default subscriber: {e}")))?;

    debug!("Logging system initialized with config: {:?}", config);
    Ok(())
}

/// Scoped subscriber for tests and demos; restores the previous one on drop.
pub struct LogLevelGuard {
    _guard: tracing::dispatcher::DefaultGuard,
}

impl LogLevelGuard {
    pub fn set_level(level: &str) -> Self {
        let filter = EnvFilter::new(level);
        let subscriber = tracing_subscriber::registry()
            .with(subscriber_fmt::layer())
            .with(filter);

        LogLevelGuard {
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }
}
