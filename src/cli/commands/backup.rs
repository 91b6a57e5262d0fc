use std::path::Path;

use colored::Colorize;

use crate::cli::BackupAction;
use crate::cli::commands::identity::read_file;
use crate::cli::commands::session::Session;
use crate::cli::output;
use crate::core::errors::Result;
use crate::core::models::audit_entry::AuditAction;
use crate::core::models::backup::Backup;
use crate::core::services::backup::BackupService;

/// Execute `sealroom backup <action>`.
pub fn execute(action: &BackupAction) -> Result<()> {
    let session = Session::open()?;
    match action {
        BackupAction::Save { file } => execute_save(&session, file),
        BackupAction::Load { file } => execute_load(&session, file),
    }
}

fn execute_save(session: &Session, file: &Path) -> Result<()> {
    let backup = BackupService::new(&session.keys, &session.crypto)
        .snapshot(Some(session.config.room.username.as_str()))?;

    std::fs::write(file, backup.to_json()?)?;
    output::success(&format!(
        "Backup written to {} ({} recipient key(s))",
        file.display(),
        backup.recipient_keys.len()
    ));
    output::warning("The file holds your private key. Keep it somewhere safe.");
    Ok(())
}

fn execute_load(session: &Session, file: &Path) -> Result<()> {
    let backup = Backup::parse(&read_file(file)?)?;
    let summary = BackupService::new(&session.keys, &session.crypto).restore(&backup)?;

    output::success(&format!(
        "Identity restored: {}",
        summary.own_fingerprint.to_string().cyan()
    ));
    output::success(&format!("{} recipient key(s) trusted", summary.imported));
    if summary.skipped > 0 {
        output::warning(&format!("{} unreadable key(s) skipped", summary.skipped));
    }
    if let Some(name) = backup.username.as_deref() {
        if name != session.config.room.username {
            output::detail(&format!(
                "Backup username is '{name}'; set [room] username in config.toml to use it"
            ));
        }
    }

    session.audit(
        AuditAction::BackupRestore,
        vec![summary.own_fingerprint.to_string()],
        Some(format!("{} imported, {} skipped", summary.imported, summary.skipped)),
    );
    Ok(())
}
