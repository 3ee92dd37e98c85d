//! Logging - tracing-subscriber to stderr (stdout is reserved for CLI JSON)

use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// `BITMEME_LOG_JSON=1` selects JSON lines.
    pub fn from_env() -> Self {
        match std::env::var("BITMEME_LOG_JSON").as_deref() {
            Ok("1") | Ok("true") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

pub fn init_logging() {
    init_logging_with(LogFormat::from_env(), None);
}

/// `directive` overrides `RUST_LOG`; without either the level is `info`.
pub fn init_logging_with(format: LogFormat, directive: Option<&str>) {
    let env_filter = match directive {
        Some(d) => EnvFilter::new(d),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    // try_init: a second call (tests, embedding apps) keeps the first subscriber
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}
