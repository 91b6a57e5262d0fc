use std::path::Path;

use chrono::Utc;

use crate::adapters::audit::json_audit_logger::JsonAuditLogger;
use crate::cli::output;
use crate::config::app_config::AppConfig;
use crate::core::models::audit_entry::{AuditAction, AuditEntry};
use crate::core::traits::audit::AuditLogger;

/// Record an audit event. Warns on failure instead of propagating
/// the error, since audit should not block the main operation.
pub fn log_audit(
    dir: &Path,
    config: &AppConfig,
    action: AuditAction,
    fingerprints: Vec<String>,
    detail: Option<String>,
    state_hash: Option<String>,
) {
    let audit_section = config.audit.as_ref();
    if !JsonAuditLogger::is_enabled(audit_section) {
        return;
    }

    let logger = JsonAuditLogger::from_config(dir, audit_section);
    let entry = AuditEntry {
        timestamp: Utc::now(),
        author: config.room.username.clone(),
        action,
        fingerprints,
        detail,
        state_hash,
    };

    if let Err(e) = logger.log_event(&entry) {
        output::warning(&format!("Could not write audit log: {e}"));
    }
}
