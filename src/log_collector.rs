//! Operator-facing log stream for staging runs.
//!
//! Every record goes to stderr immediately. When a log directory is
//! configured the same lines are also handed to a background writer thread
//! that appends them to `<log_dir>/stage-<timestamp>.log`, so a run that is
//! killed while waiting on a long remote build still leaves a complete log
//! of what it submitted.
//!
//! # Architecture
//!
//! ```text
//! log::info!() ...
//!     |
//! [LogCollector] (log::Log)
//!     |                \
//!   stderr        crossbeam channel
//!                       |
//!                 [disk writer thread] -> <log_dir>/stage-<ts>.log
//! ```

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Internal log line or special marker
enum LogMessage {
    Line(LogLine),
    /// Flush marker with channel sender to signal completion
    Flush(std::sync::mpsc::Sender<()>),
}

/// A formatted log line
#[derive(Clone, Debug)]
pub struct LogLine {
    pub level: Level,
    pub message: String,
    /// Wall clock time the record was produced (HH:MM:SS.mmm)
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: String) -> Self {
        LogLine {
            level,
            message,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    /// `[HH:MM:SS.mmm] LEVEL message`
    pub fn render(&self) -> String {
        format!("[{}] {:<5} {}", self.timestamp, self.level, self.message)
    }
}

/// `log` backend writing to stderr and, optionally, a per-run log file.
#[derive(Clone)]
pub struct LogCollector {
    /// Disk writer channel; None when no log directory is configured
    tx: Option<Sender<LogMessage>>,
    log_path: Option<PathBuf>,
    level: LevelFilter,
}

impl LogCollector {
    /// Create a collector. With `log_dir` set, the directory is created and a
    /// writer thread is started for this run's log file.
    pub fn new(log_dir: Option<&Path>, level: LevelFilter) -> Result<Self, String> {
        let Some(log_dir) = log_dir else {
            return Ok(LogCollector {
                tx: None,
                log_path: None,
                level,
            });
        };

        std::fs::create_dir_all(log_dir)
            .map_err(|e| format!("Failed to create logs directory: {}", e))?;

        let log_path = log_dir.join(format!("stage-{}.log", Local::now().format("%Y%m%d_%H%M%S")));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| format!("Failed to open log file {}: {}", log_path.display(), e))?;

        let (tx, rx) = unbounded::<LogMessage>();

        // OS thread rather than a tokio task so lines still reach disk while
        // the runtime is blocked or shutting down.
        std::thread::spawn(move || {
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        let _ = writeln!(file, "{}", line.render());
                    }
                    LogMessage::Flush(done) => {
                        let _ = file.flush();
                        let _ = file.sync_data();
                        let _ = done.send(());
                    }
                }
            }
        });

        Ok(LogCollector {
            tx: Some(tx),
            log_path: Some(log_path),
            level,
        })
    }

    /// Install this collector as the global `log` backend.
    pub fn install(self) -> Result<(), String> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))
            .map(|()| log::set_max_level(level))
            .map_err(|e| format!("Failed to install logger: {}", e))
    }

    /// Path of this run's log file, if one is being written
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Record a line (non-blocking for the disk writer).
    pub fn record(&self, line: LogLine) {
        eprintln!("{}", line.render());
        if let Some(tx) = &self.tx {
            let _ = tx.send(LogMessage::Line(line));
        }
    }

    /// Block until every line sent so far has been written to disk.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let Some(tx) = &self.tx else {
            return Ok(());
        };

        let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
        tx.send(LogMessage::Flush(done_tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        done_rx
            .recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.record(LogLine::new(record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}
