//! Per-run report sink: every report line goes to the console and to a
//! timestamped append-mode log file, in order.
//!
//! The file is an audit trail, never a reason to fail a run: open, write,
//! and flush problems are logged at debug level and otherwise ignored.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use tracing::debug;

pub struct RunLog {
    file: Option<File>,
    path: Option<PathBuf>,
}

impl RunLog {
    /// Open `<base>_<YYYYmmdd-HHMMSS>.log` in append mode.
    pub fn open(base: &str) -> Self {
        let path = PathBuf::from(format!(
            "{base}_{}.log",
            Local::now().format("%Y%m%d-%H%M%S")
        ));
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Self {
                file: Some(file),
                path: Some(path),
            },
            Err(e) => {
                debug!(path = %path.display(), error = %e, "could not open run log");
                Self {
                    file: None,
                    path: None,
                }
            }
        }
    }

    /// A sink that only writes to the console (used by tests).
    #[cfg(test)]
    pub fn console_only() -> Self {
        Self {
            file: None,
            path: None,
        }
    }

    /// Where this run's log file lives, if it could be opened.
    pub fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }

    /// Write one report line to both sinks.
    pub fn line(&mut self, message: &str) {
        println!("{message}");
        if let Some(file) = &mut self.file {
            if let Err(e) = writeln!(file, "{message}") {
                debug!(error = %e, "run log write failed");
            }
        }
    }

    /// Write an empty line to both sinks.
    pub fn blank(&mut self) {
        self.line("");
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        if let Some(file) = &mut self.file {
            if let Err(e) = file.flush() {
                debug!(error = %e, "run log flush failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn lines_append_to_the_run_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path().join("audit");
        let mut log = RunLog::open(&base.to_string_lossy());

        log.line("first");
        log.line("second");
        let path = log.path().expect("log file").to_path_buf();
        drop(log);

        let contents = fs::read_to_string(path).expect("read log");
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn unwritable_location_does_not_fail_the_run() {
        let mut log = RunLog::open("/nonexistent-dir/for-sure/audit");
        assert!(log.path().is_none());
        log.line("still prints");
    }
}
