//! Structured logging setup, a simplified subset of the kit this
//! workspace's tracing helpers are built from: a pretty stderr layer
//! always on, and an optional DEBUG file layer when the job config asks
//! for one. No runtime log-level reload is needed here, so the
//! reload-handle machinery that setup lives without.

use std::fs;
use std::path::Path;

use anyhow::Result;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use scatter_config::LogConfig;

/// Installs the global tracing subscriber. `file_path` comes from
/// [`scatter_config::AppConfig::log_filename`]; `None` means
/// `log.log_to_file` is off. The file layer writes through a
/// [`RollingFileAppender`] pinned to `Rotation::NEVER` so a run always
/// appends to exactly the configured path rather than a daily-rotated
/// one.
pub fn init(cfg: &LogConfig, file_path: Option<&Path>) -> Result<()> {
    let level = cfg.level();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_timer(ChronoLocal::rfc_3339())
        .with_target(false)
        .with_filter(env_filter);

    let registry = tracing_subscriber::registry().with(stderr_layer);

    match file_path {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            fs::create_dir_all(dir)?;
            let file_name = path.file_name().ok_or_else(|| anyhow::anyhow!("log path {} has no file name", path.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name.to_string_lossy().into_owned())
                .build(dir)?;
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_timer(ChronoLocal::rfc_3339())
                .with_writer(appender)
                .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);
            registry.with(file_layer).try_init()?;
        }
        None => registry.try_init()?,
    }

    Ok(())
}
