//! Access log file writer
//!
//! Records are appended to the file from a background thread so request
//! tasks never block on disk writes.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

/// Open `path` for appending and wrap it in a non-blocking writer
pub fn access_writer(path: &str) -> io::Result<(NonBlocking, WorkerGuard)> {
    let file = open_log_file(path)?;
    Ok(tracing_appender::non_blocking(file))
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}
