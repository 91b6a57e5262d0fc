use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::app_config::AuditSection;
use crate::core::errors::{Result, SealroomError};
use crate::core::models::audit_entry::AuditEntry;
use crate::core::traits::audit::AuditLogger;

/// Appends audit entries as JSON lines, one object per line.
pub struct JsonAuditLogger {
    log_path: PathBuf,
}

impl JsonAuditLogger {
    pub fn new(data_dir: &Path, log_file: &str) -> Self {
        Self {
            log_path: data_dir.join(log_file),
        }
    }

    /// Logger for the `[audit]` section, `audit.log` when absent.
    pub fn from_config(data_dir: &Path, audit: Option<&AuditSection>) -> Self {
        let log_file = audit.map(|a| a.log_file.as_str()).unwrap_or("audit.log");
        Self::new(data_dir, log_file)
    }

    /// Auditing is on unless the config turns it off.
    pub fn is_enabled(audit: Option<&AuditSection>) -> bool {
        audit.is_none_or(|a| a.enabled)
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

impl AuditLogger for JsonAuditLogger {
    fn log_event(&self, entry: &AuditEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry).map_err(|e| SealroomError::AuditError {
            detail: format!("cannot encode {} entry: {e}", entry.action),
        })?;
        line.push('\n');

        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // One write_all per entry; lines never interleave.
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|e| SealroomError::AuditError {
                detail: format!("{}: {e}", self.log_path.display()),
            })
    }

    /// Entries in file order. A line that does not parse (a torn write,
    /// a hand edit) is skipped with a warning.
    fn query(&self) -> Result<Vec<AuditEntry>> {
        let text = match fs::read_to_string(&self.log_path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SealroomError::AuditError {
                    detail: format!("{}: {e}", self.log_path.display()),
                });
            }
        };

        let entries = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(line = n + 1, error = %e, "skipping malformed audit entry");
                    None
                }
            })
            .collect();

        Ok(entries)
    }
}
