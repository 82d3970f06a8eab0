//! Append-only record of every prompt sent to the local model.
//!
//! Entries are written and synced before the request goes out, so a prompt is
//! on disk even when the model call then fails or hangs.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

const SEPARATOR_WIDTH: usize = 40;

/// Append-only prompt log at a fixed path.
#[derive(Debug, Clone)]
pub struct PromptAuditLog {
    path: PathBuf,
}

impl PromptAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry: timestamp, file name, full prompt, separator line.
    pub fn record(&self, file_name: &str, prompt: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let entry = format!(
            "\n[{timestamp}]\nFILE: {file_name}\nPROMPT:\n{prompt}\n{separator}\n",
            timestamp = Local::now().format("%a %b %e %H:%M:%S %Y"),
            separator = "-".repeat(SEPARATOR_WIDTH),
        );
        file.write_all(entry.as_bytes())?;
        file.sync_data()
    }
}
