use colored::Colorize;

use crate::adapters::audit::json_audit_logger::JsonAuditLogger;
use crate::cli::{context, output};
use crate::config::app_config::AppConfig;
use crate::core::errors::Result;
use crate::core::models::audit_entry::{AuditAction, AuditEntry};
use crate::core::traits::audit::AuditLogger;

/// Execute the `sealroom log` command.
pub fn execute(last: Option<usize>) -> Result<()> {
    let dir = context::require_initialized()?;
    let config = AppConfig::load(dir)?;
    let logger = JsonAuditLogger::from_config(dir, config.audit.as_ref());

    let entries = logger.query()?;
    if entries.is_empty() {
        output::header("sealroom log");
        output::warning(&format!("No audit entries in {}", logger.path().display()));
        return Ok(());
    }

    let skip = last.map_or(0, |n| entries.len().saturating_sub(n));
    let display = &entries[skip..];

    output::header(&format!("sealroom log ({} entries)", display.len()));
    println!();
    for entry in display {
        print_entry(entry);
    }
    Ok(())
}

fn print_entry(entry: &AuditEntry) {
    let date = entry.timestamp.format("%Y-%m-%d %H:%M:%S");
    let fingerprints = if entry.fingerprints.is_empty() {
        "-".dimmed().to_string()
    } else {
        entry
            .fingerprints
            .iter()
            .map(|f| short(f))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let detail = entry.detail.as_deref().unwrap_or("").dimmed().to_string();

    println!(
        "  {} {} {:<16} {} {}",
        date.to_string().dimmed(),
        "│".dimmed(),
        format_action(&entry.action),
        fingerprints,
        detail,
    );
}

/// Last 16 hex digits, the long key ID.
fn short(fingerprint: &str) -> &str {
    let start = fingerprint.len().saturating_sub(16);
    fingerprint.get(start..).unwrap_or(fingerprint)
}

fn format_action(action: &AuditAction) -> String {
    let label = action.to_string();
    match action {
        AuditAction::Init => label.cyan(),
        AuditAction::IdentityGenerate | AuditAction::IdentityImport => label.blue(),
        AuditAction::KeyImport | AuditAction::BackupRestore => label.green(),
        AuditAction::KeyReject | AuditAction::KeyRemove | AuditAction::KeysClear => label.red(),
        AuditAction::KeyRename => label.yellow(),
        AuditAction::MessageSend => label.magenta(),
    }
    .to_string()
}
