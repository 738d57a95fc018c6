//! Diagnostics for the command-line tool.
//!
//! Every command prints its result (JSON, invoice text) on stdout, so
//! tracing output goes to stderr and, once `[logging] file` is set, to an
//! append-only log file as well.

use std::{
    fs::File,
    io::{self, IsTerminal, Write},
    path::Path,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        FmtContext, MakeWriter,
        format::{FormatEvent, FormatFields, Writer},
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "warn";

// --- Line layout ---

/// One event per line: `<local time> <LEVEL> <target> <fields>`.
///
/// Escape codes are written only when the writer reports ANSI support,
/// i.e. for stderr attached to a terminal. The log file always gets
/// plain text.
struct StderrFormat;

const RESET: &str = "\x1b[0m";

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[1;31m",
        Level::WARN => "\x1b[1;33m",
        Level::INFO => "\x1b[1;32m",
        Level::DEBUG => "\x1b[1;34m",
        Level::TRACE => "\x1b[1;35m",
    }
}

impl<S, N> FormatEvent<S, N> for StderrFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");

        if writer.has_ansi_escapes() {
            write!(
                writer,
                "\x1b[2m{timestamp}{RESET} {}{:>5}{RESET} \x1b[36m{}{RESET} ",
                level_color(*meta.level()),
                meta.level(),
                meta.target()
            )?;
        } else {
            write!(writer, "{timestamp} {:>5} {} ", meta.level(), meta.target())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

// --- Optional log file ---

/// Writer for the file layer. Holds no file until `[logging] file` is
/// applied; until then lines are dropped.
#[derive(Clone)]
struct LogFile(Arc<Mutex<Option<File>>>);

impl LogFile {
    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct LogFileWriter<'a>(MutexGuard<'a, Option<File>>);

impl Write for LogFileWriter<'_> {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        match self.0.as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.as_mut().map_or(Ok(()), Write::flush)
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileWriter(self.lock())
    }
}

// --- Installed state ---

type ReloadFilter = Box<dyn Fn(EnvFilter) -> Result<()> + Send + Sync>;

/// Set only by the call to `init_default_logging` that installed the
/// global subscriber.
static RELOAD_FILTER: OnceLock<ReloadFilter> = OnceLock::new();
static LOG_FILE: OnceLock<LogFile> = OnceLock::new();

fn not_initialized() -> anyhow::Error {
    anyhow::anyhow!("logging has not been initialized")
}

// --- Public API ---

/// Replaces the level filter, e.g. `"debug"` or
/// `"warn,invoicing_core=trace"`.
pub fn set_log_level(directive: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .with_context(|| format!("invalid log level '{directive}'"))?;
    let reload = RELOAD_FILTER.get().ok_or_else(not_initialized)?;
    reload(filter)
}

/// Appends log lines to `path` from now on. A second call switches files.
pub fn enable_file_logging(path: &Path) -> Result<()> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file '{}'", path.display()))?;

    let slot = LOG_FILE.get().ok_or_else(not_initialized)?;
    *slot.lock() = Some(file);
    Ok(())
}

/// Installs the global subscriber before the config file is read.
///
/// Starts at `warn` unless `RUST_LOG` says otherwise, so a plain
/// `invoicing calculate` prints nothing but its JSON.
pub fn init_default_logging() {
    let log_file = LOG_FILE.get_or_init(|| LogFile(Arc::new(Mutex::new(None)))).clone();

    let initial =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let (filter, handle) = reload::Layer::new(initial);

    let stderr = tracing_subscriber::fmt::layer()
        .event_format(StderrFormat)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr);

    let file = tracing_subscriber::fmt::layer()
        .event_format(StderrFormat)
        .with_ansi(false)
        .with_writer(log_file);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init()
        .is_ok();

    if installed {
        let _ = RELOAD_FILTER.set(Box::new(move |filter| {
            handle
                .reload(filter)
                .map_err(|e| anyhow::anyhow!("failed to swap log filter: {e}"))
        }));
    }
}

/// Applies the `[logging]` section. An explicit `RUST_LOG` wins over
/// `level`.
pub fn apply_config(config: &LoggingConfig) -> Result<()> {
    if let Some(level) = &config.level {
        if std::env::var_os("RUST_LOG").is_none() {
            set_log_level(level)?;
        }
    }
    if let Some(path) = &config.file {
        enable_file_logging(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_in_missing_directory_is_an_error() {
        init_default_logging();

        let result = enable_file_logging(Path::new("/nonexistent/dir/invoicing.log"));

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.starts_with("cannot open log file"), "{message}");
    }

    #[test]
    fn malformed_level_is_rejected_before_reload() {
        let message = format!("{:#}", set_log_level("invoicing=loud").unwrap_err());

        assert!(message.starts_with("invalid log level 'invoicing=loud'"), "{message}");
    }

    #[test]
    fn level_can_be_raised_once_installed() {
        init_default_logging();

        // Skipped when some other subscriber was installed globally first.
        if RELOAD_FILTER.get().is_some() {
            assert!(set_log_level("debug").is_ok());
            assert!(set_log_level(DEFAULT_FILTER).is_ok());
        }
    }

    #[test]
    fn empty_config_changes_nothing() {
        assert!(apply_config(&LoggingConfig::default()).is_ok());
    }
}
