//! Logging setup for the runner
//!
//! The subscriber is installed before configuration is read so that config
//! loading can itself log (a missing file is only a warning). `RUST_LOG`
//! takes precedence; otherwise logging starts at `info` and switches to the
//! configured level once the config is loaded.

use canon_common::{Error, Result};
use tracing::{debug, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, reload, EnvFilter, Registry};

/// Level used until configuration is loaded
pub const DEFAULT_LEVEL: &str = "info";

/// Handle for switching the log level after the subscriber is installed
pub struct LogLevel {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogLevel {
    /// Apply the configured level unless `RUST_LOG` already chose one
    pub fn apply(&self, level: &str) -> Result<()> {
        if self.from_env {
            debug!("RUST_LOG set, ignoring configured level {}", level);
            return Ok(());
        }

        let filter = EnvFilter::try_new(level)
            .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", level, e)))?;
        self.handle
            .reload(filter)
            .map_err(|e| Error::Config(format!("Failed to apply log level: {}", e)))
    }
}

/// Build the runner's subscriber, writing formatted events to `writer`
pub fn subscriber<W>(writer: W) -> (impl Subscriber + Send + Sync + 'static, LogLevel)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    subscriber_with(EnvFilter::try_from_default_env().ok(), writer)
}

fn subscriber_with<W>(
    env_filter: Option<EnvFilter>,
    writer: W,
) -> (impl Subscriber + Send + Sync + 'static, LogLevel)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let from_env = env_filter.is_some();
    let filter = env_filter.unwrap_or_else(|| EnvFilter::new(DEFAULT_LEVEL));
    let (filter, handle) = reload::Layer::new(filter);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer));

    (subscriber, LogLevel { handle, from_env })
}
