use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// File name inside the log directory.
pub const LOG_FILE_NAME: &str = "shadow.log";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `--debug`, which wins over the configured level.
/// With a log directory, output is appended to `shadow.log` there (and
/// echoed to stdout under `--debug`); otherwise it goes to stderr so that
/// command output on stdout stays clean.
pub fn init(debug: bool, log_dir: Option<&Path>, level: &str) -> anyhow::Result<()> {
    let level = if debug { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level {level:?}"))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let path = dir.join(LOG_FILE_NAME);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            let file = Arc::new(file);
            if debug {
                builder
                    .with_ansi(false)
                    .with_writer(std::io::stdout.and(file))
                    .try_init()
            } else {
                builder.with_ansi(false).with_writer(file).try_init()
            }
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("cannot install logger: {e}"))
}
