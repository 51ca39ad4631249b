//! Run log - the timestamped record of a run that is mailed at the end
//!
//! Every message goes to two places: a line `[<timestamp>] <message>` appended
//! to the log file, and the bare message on stdout. The file is truncated when
//! the log is created, so it only ever holds the current run.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// First line of every log file
pub const LOG_HEADER: &str = "Git Automation Log";

/// Append-only run log shared by every component of a run
#[derive(Debug)]
pub struct RunLog {
    path: Option<PathBuf>,
    last_timestamp: Mutex<Option<DateTime<Utc>>>,
}

impl RunLog {
    /// Create or truncate the log file and write the header
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
        }

        std::fs::write(path, format!("{}\n\n", LOG_HEADER))
            .with_context(|| format!("Failed to initialize log file: {:?}", path))?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            last_timestamp: Mutex::new(None),
        })
    }

    /// A log that only writes to stdout
    pub fn console() -> Self {
        Self {
            path: None,
            last_timestamp: Mutex::new(None),
        }
    }

    /// Path of the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record a message
    pub fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();

        if let Some(path) = &self.path {
            let line = format!("[{}] {}\n", self.next_timestamp(), message);
            if let Err(e) = append_line(path, &line) {
                warn!("Failed to write to log file {}: {}", path.display(), e);
            }
        }

        println!("{}", message);
    }

    /// RFC 3339 timestamp strictly later than the previous one
    fn next_timestamp(&self) -> String {
        let now = Utc::now();
        let mut last = self
            .last_timestamp
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let stamp = match *last {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(stamp);

        stamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    file.write_all(line.as_bytes())
}
