// Mon Oct 19 2026 - Alex

use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::time::Instant;

pub struct LoggingUtils;

impl LoggingUtils {
    pub fn init_logger(level: LevelFilter, use_color: bool) {
        let logger = Box::new(ColoredLogger::new(level, use_color));
        log::set_boxed_logger(logger).ok();
        log::set_max_level(level);
    }

    pub fn level_from_str(s: &str) -> LevelFilter {
        match s.to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info,
        }
    }

    pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

struct ColoredLogger {
    level: LevelFilter,
    use_color: bool,
}

impl ColoredLogger {
    fn new(level: LevelFilter, use_color: bool) -> Self {
        Self { level, use_color }
    }

    fn format_level(&self, level: Level) -> ColoredString {
        match level {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".green().bold(),
            Level::Debug => "DEBUG".blue().bold(),
            Level::Trace => "TRACE".magenta().bold(),
        }
    }
}

impl Log for ColoredLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let target = short_target(record.target());
        if self.use_color {
            eprintln!(
                "{} {} {}",
                self.format_level(record.level()),
                format!("[{}]", target).dimmed(),
                record.args()
            );
        } else {
            eprintln!("{:5} [{}] {}", record.level(), target, record.args());
        }
    }

    fn flush(&self) {}
}

/// `rtti_dumper::scan::reference` -> `scan::reference`
fn short_target(target: &str) -> &str {
    target.strip_prefix("rtti_dumper::").unwrap_or(target)
}

/// Logs how long a scope took at debug level.
pub struct ScopedTimer {
    name: String,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(name: &str) -> Self {
        log::debug!("[TIMER] {} started", name);
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        log::debug!("[TIMER] {} took {:.2}ms", self.name, elapsed.as_secs_f64() * 1000.0);
    }
}

/// Coloured logger at the level implied by `-v` flags.
pub fn init_logger(verbosity: u8) {
    LoggingUtils::init_logger(LoggingUtils::level_from_verbosity(verbosity), true);
}

/// `RUST_LOG`-driven logging.
pub fn init_from_env() {
    env_logger::init();
}
