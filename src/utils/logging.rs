use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";

const LOG_DIR: &str = "logs";
const KEPT_LOG_FILES: usize = 5;
const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

/// Picks the level for this crate's logs: the `--log-filter` flag wins, then `RUST_LOG`, then
/// [DEFAULT_LEVEL]. Logs of other crates are never enabled.
fn filter_directive(log_level: Option<LevelFilter>, env_level: Option<&str>) -> String {
    let level = log_level
        .map(|v| v.to_string())
        .or_else(|| {
            env_level
                .map(str::trim)
                .filter(|v| v.parse::<LevelFilter>().is_ok())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());
    format!("{}={level}", env!("CARGO_PKG_NAME").replace("-", "_"))
}

/// Writes logs of the store and its commands into daily rolling files under
/// `<application dir>/logs`. Console output is only mirrored when `show_std` is set, so that
/// command output stays readable.
pub fn enable_logging(
    prefix: &str,
    application_data_path: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(KEPT_LOG_FILES)
        .filename_prefix(prefix)
        .build(application_data_path.join(LOG_DIR))?;

    let stdout = std::io::stdout.with_filter(move |_| show_std);

    let env_level = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(log_level, env_level.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stdout.and(appender))
        .with_ansi(show_std)
        .init();
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});
