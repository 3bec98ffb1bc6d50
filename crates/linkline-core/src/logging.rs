//! Logging utilities with indicatif integration

use indicatif::MultiProgress;

/// Log target for batch-level outcomes (load completed, batch failed).
///
/// Operators filter on it with `RUST_LOG=notify=info` to get one line per batch.
pub const NOTIFY_TARGET: &str = "notify";

/// ANSI color code and padded label for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Render one record as a single line; notify records carry a marker.
fn format_line(record: &log::Record, color: bool) -> String {
    let (pre, label, post) = level_style(record.level(), color);
    if record.target() == NOTIFY_TARGET {
        format!("[{pre}{label}{post}] [notify] {}", record.args())
    } else {
        format!("[{pre}{label}{post}] {}", record.args())
    }
}

/// Logger that prints through indicatif MultiProgress to avoid mixing with progress bars.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            let line = format_line(record, true);
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Initialize logging with optional TTY mode (indicatif integration)
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let default_level = if debug {
        "debug"
    } else if quiet {
        // batch outcomes stay visible even when progress bars replace info logs
        "warn,notify=info"
    } else {
        "info"
    };

    if let Some(multi) = multi {
        let logger = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(default_level),
        )
        .format_timestamp_millis()
        .build();
        let max_level = logger.filter();

        log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone())))
            .expect("failed to init logger");
        log::set_max_level(max_level);
    } else {
        // Non-TTY: no ANSI colors, one line per record for log aggregation
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format(|buf, record| writeln!(buf, "{}", format_line(record, false)))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(target: &str, level: log::Level) -> String {
        format_line(
            &log::Record::builder()
                .args(format_args!("batch loaded"))
                .level(level)
                .target(target)
                .build(),
            false,
        )
    }

    #[test]
    fn plain_record_has_level_label() {
        assert_eq!(
            render("linkline_relations", log::Level::Info),
            "[INFO ] batch loaded"
        );
    }

    #[test]
    fn notify_record_is_marked() {
        assert_eq!(
            render(NOTIFY_TARGET, log::Level::Error),
            "[ERROR] [notify] batch loaded"
        );
    }

    #[test]
    fn colored_label_is_wrapped_in_ansi() {
        let (pre, label, post) = level_style(log::Level::Warn, true);
        assert_eq!(pre, "\x1b[33m");
        assert_eq!(label, "WARN ");
        assert_eq!(post, "\x1b[0m");
    }
}
