//! Tracing subscriber setup for the binary.
//!
//! The library only emits events; the application decides where they go.

use std::io::{self, Write};

use indicatif::ProgressBar;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Maps `-v` occurrences to a default filter.
pub const fn verbosity_to_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `verbosity`.
///
/// Log lines are printed with `progress_bar` suspended so they never tear it.
pub fn init(verbosity: u8, progress_bar: ProgressBar) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(verbosity_to_filter(verbosity))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(verbosity > 0)
                .with_writer(BarAwareStderr::new(progress_bar)),
        )
        .try_init()?;
    Ok(())
}

/// Stderr writer that clears a progress bar while a log line is printed.
#[derive(Clone)]
pub struct BarAwareStderr {
    progress_bar: ProgressBar,
}

impl BarAwareStderr {
    pub const fn new(progress_bar: ProgressBar) -> Self {
        Self { progress_bar }
    }
}

impl<'a> MakeWriter<'a> for BarAwareStderr {
    type Writer = SuspendedLine;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendedLine {
            progress_bar: self.progress_bar.clone(),
            buffer: Vec::new(),
        }
    }
}

/// Buffers one formatted event and emits it on flush or drop.
pub struct SuspendedLine {
    progress_bar: ProgressBar,
    buffer: Vec<u8>,
}

impl Write for SuspendedLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let buffer = std::mem::take(&mut self.buffer);
        self.progress_bar
            .suspend(|| io::stderr().lock().write_all(&buffer))
    }
}

impl Drop for SuspendedLine {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(verbosity_to_filter(0), "info");
        assert_eq!(verbosity_to_filter(1), "debug");
        assert_eq!(verbosity_to_filter(2), "trace");
        assert_eq!(verbosity_to_filter(7), "trace");
    }

    #[test]
    fn test_log_line_is_buffered_until_flush() -> io::Result<()> {
        let make_writer = BarAwareStderr::new(ProgressBar::hidden());
        let mut line = make_writer.make_writer();

        write!(line, "WARN crop fallback")?;
        line.write_all(b"\n")?;
        assert_eq!(line.buffer, b"WARN crop fallback\n");

        line.flush()?;
        assert!(line.buffer.is_empty());
        Ok(())
    }
}
