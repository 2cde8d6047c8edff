//! Console output
//!
//! Command results go through an [`OutputFormatter`]; engine events during a
//! pass go through [`ConsoleObserver`]. Both render a line with
//! [`render_line`], so a pass and its final report read the same way.
//!
//! In JSON mode stdout carries only result documents; every message is one
//! JSON object per line on stderr.

use drimesync_core::domain::MirrorPhase;
use drimesync_core::ports::{ISyncObserver, LogLevel};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Destination of a rendered line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Renders one message, or `None` when it is suppressed
///
/// Quiet mode keeps errors only; debug lines never reach the human console.
pub fn render_line(
    format: OutputFormat,
    quiet: bool,
    level: LogLevel,
    message: &str,
) -> Option<(Stream, String)> {
    if quiet && level != LogLevel::Error {
        return None;
    }
    match format {
        OutputFormat::Json => Some((
            Stream::Stderr,
            serde_json::json!({"event": "log", "level": level, "message": message}).to_string(),
        )),
        OutputFormat::Human => {
            let line = match level {
                LogLevel::Debug => return None,
                LogLevel::Info => (Stream::Stdout, format!("  {}", message)),
                LogLevel::Success => (Stream::Stdout, format!("\u{2713} {}", message)),
                LogLevel::Warning => (Stream::Stderr, format!("\u{26a0} Warning: {}", message)),
                LogLevel::Error => (Stream::Stderr, format!("\u{2717} Error: {}", message)),
            };
            Some(line)
        }
    }
}

fn emit(line: Option<(Stream, String)>) {
    match line {
        Some((Stream::Stdout, text)) => println!("{}", text),
        Some((Stream::Stderr, text)) => eprintln!("{}", text),
        None => {}
    }
}

/// Writes command results
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    /// Prints a result document; human output ignores it
    fn print_json(&self, value: &serde_json::Value);
}

/// Formatter for one [`OutputFormat`] and quiet setting
pub struct ConsoleFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl ConsoleFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn success(&self, message: &str) {
        emit(render_line(self.format, self.quiet, LogLevel::Success, message));
    }
    fn error(&self, message: &str) {
        emit(render_line(self.format, self.quiet, LogLevel::Error, message));
    }
    fn warn(&self, message: &str) {
        emit(render_line(self.format, self.quiet, LogLevel::Warning, message));
    }
    fn info(&self, message: &str) {
        emit(render_line(self.format, self.quiet, LogLevel::Info, message));
    }
    fn print_json(&self, value: &serde_json::Value) {
        if self.format == OutputFormat::Json {
            println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_default()
            );
        }
    }
}

/// Prints engine events while a pass runs
pub struct ConsoleObserver {
    format: OutputFormat,
    quiet: bool,
}

impl ConsoleObserver {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }
}

impl ISyncObserver for ConsoleObserver {
    fn log(&self, level: LogLevel, message: &str) {
        emit(render_line(self.format, self.quiet, level, message));
    }

    fn phase(&self, phase: &MirrorPhase) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Json => eprintln!(
                "{}",
                serde_json::json!({"event": "phase", "phase": phase.name()})
            ),
            OutputFormat::Human => println!("\u{2192} {}", phase),
        }
    }
}
