//! Audit logger for writing audit entries to file.
//!
//! Writes structured audit entries as JSON lines (one JSON object per line)
//! for easy parsing by log analysis tools.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::GateError;

use super::entry::AuditEntry;

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn log(&self, entry: &AuditEntry) -> Result<(), GateError>;
}

/// Writes audit entries to a file in JSON lines format.
pub struct AuditLogger {
    file: Mutex<File>,
    path: PathBuf,
}

impl AuditLogger {
    /// Open `path` for appending, creating the parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory cannot be created
    /// - File cannot be opened for appending
    pub fn new(path: &Path) -> Result<Self, GateError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!(path = %parent.display(), "Creating audit log directory");
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        debug!(path = %path.display(), "Audit logger initialized");

        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the audit log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for AuditLogger {
    /// Serialize the entry as a single line and sync it to disk.
    fn log(&self, entry: &AuditEntry) -> Result<(), GateError> {
        let json = serde_json::to_string(entry)?;

        let mut file = self.file.lock().map_err(|e| GateError::Server {
            message: format!("Failed to acquire audit log lock: {}", e),
        })?;

        writeln!(file, "{}", json)?;

        if let Err(e) = file.sync_data() {
            warn!(error = %e, "Failed to sync audit log");
        }

        debug!(
            request_id = %entry.request_id,
            endpoint = %entry.endpoint,
            "Audit entry logged"
        );

        Ok(())
    }
}

/// A no-op audit logger for tests or when audit logging is disabled.
#[derive(Debug, Default)]
pub struct NullAuditLogger;

impl NullAuditLogger {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for NullAuditLogger {
    fn log(&self, _entry: &AuditEntry) -> Result<(), GateError> {
        Ok(())
    }
}
