//! Diagnostic logging setup.
//!
//! Logs go to stderr through [`ColorizedFormatter`], or to a plain-text file
//! when `--log-file` is given. Stdout is left to the report.

use anyhow::{anyhow, Context, Result};
use colored::*;
use std::fmt;
use std::path::Path;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Terminal formatter for stress-test progress on stderr.
///
/// Prints just the message: the multi-line "Starting Load Test" block and the
/// per-worker debug lines stay aligned. Warnings such as unreachable echo
/// servers show up yellow, worker trace chatter purple.
pub struct ColorizedFormatter;

impl<S, N> FormatEvent<S, N> for ColorizedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut line = String::new();
        ctx.format_fields(Writer::new(&mut line), event)?;

        writeln!(writer, "{}", line.color(level_color(*event.metadata().level())))
    }
}

fn level_color(level: Level) -> Color {
    match level {
        Level::ERROR => Color::Red,
        Level::WARN => Color::Yellow,
        Level::INFO => Color::White,
        Level::DEBUG => Color::Blue,
        Level::TRACE => Color::Magenta,
    }
}

/// Level directive selected by the `-v`/`-q` flags
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "warn";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// `RUST_LOG` when set, otherwise the flag-derived level
pub fn build_filter(verbose: u8, quiet: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)))
}

/// Open `path` for logging behind a non-blocking writer
///
/// An existing file is truncated. The returned guard flushes pending lines
/// when dropped.
pub fn file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path {:?} has no file name", path))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to replace log file {:?}", path))?;
    }

    let appender = tracing_appender::rolling::never(directory, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

/// Install the global subscriber
///
/// Returns the file writer's guard when logging to a file; the caller must
/// keep it alive until the process is done logging.
pub fn init(verbose: u8, quiet: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(verbose, quiet);

    match log_file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .map_err(|e| anyhow!("Failed to install file logger: {}", e))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .event_format(ColorizedFormatter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow!("Failed to install stderr logger: {}", e))?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(0, false), "info");
        assert_eq!(default_directive(1, false), "debug");
        assert_eq!(default_directive(5, false), "trace");
        assert_eq!(default_directive(2, true), "warn");
    }

    #[test]
    fn test_colorized_formatter_prints_fields_only() {
        let output = CapturedOutput::default();
        let writer = output.clone();
        let subscriber = tracing_subscriber::fmt()
            .event_format(ColorizedFormatter)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Starting Load Test");
        });

        let text = String::from_utf8(output.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("Starting Load Test"));
        assert!(!text.contains("INFO"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_file_writer_receives_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stress.log");
        std::fs::write(&path, "stale line\n").unwrap();

        let (writer, guard) = file_writer(&path).unwrap();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(writer)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("worker task terminated abnormally");
        });
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("worker task terminated abnormally"));
        assert!(!contents.contains("stale line"));
    }
}
