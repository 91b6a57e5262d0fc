use std::path::Path;

use colored::Colorize;

use crate::cli::commands::identity::read_file;
use crate::cli::commands::session::Session;
use crate::cli::{KeysAction, output};
use crate::core::errors::{Result, SealroomError};
use crate::core::models::audit_entry::AuditAction;
use crate::core::models::key_record::KeyOrigin;

/// Execute the `sealroom keys` command.
pub fn execute(action: &KeysAction) -> Result<()> {
    let session = Session::open()?;
    match action {
        KeysAction::List => execute_list(&session),
        KeysAction::Import { file, label } => execute_import(&session, file, label.as_deref()),
        KeysAction::Reject { file } => execute_reject(&session, file),
        KeysAction::Remove { position } => execute_remove(&session, *position),
        KeysAction::Rename { position, label } => execute_rename(&session, *position, label),
        KeysAction::Clear { yes } => execute_clear(&session, *yes),
    }
}

/// Map a 1-based position from `keys list` to a store index.
fn to_index(session: &Session, position: usize) -> Result<usize> {
    let len = session.keys.len()?;
    position
        .checked_sub(1)
        .filter(|i| *i < len)
        .ok_or(SealroomError::IndexOutOfRange {
            index: position,
            len,
        })
}

fn execute_list(session: &Session) -> Result<()> {
    let records = session.keys.records()?;

    if records.is_empty() {
        output::header("Trusted recipients");
        output::warning("No recipients yet");
        println!("  Import keys offered in the room, or: sealroom keys import <file>");
        return Ok(());
    }

    output::header(&format!("Trusted recipients ({})", records.len()));
    println!();
    for (i, record) in records.iter().enumerate() {
        let added = record
            .added_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "  {:>3}. {}  {}  {}",
            i + 1,
            record.label,
            record.fingerprint.to_string().cyan(),
            added.dimmed()
        );
    }

    let hidden = session.keys.hidden_keys()?.len();
    output::detail(&format!("{hidden} fingerprints decided on (never offered again)"));
    Ok(())
}

fn execute_import(session: &Session, file: &Path, label: Option<&str>) -> Result<()> {
    let armored = read_file(file)?;
    let file_name = file.file_name().map(|n| n.to_string_lossy().into_owned());
    let label = label.map(str::to_string).or(file_name);

    let already = session.keys.len()?;
    let fingerprint =
        session
            .trust()
            .import_key(&armored, KeyOrigin::FileImport, label.as_deref())?;

    if session.keys.len()? == already {
        output::warning(&format!("Key already trusted ({fingerprint})"));
        return Ok(());
    }

    output::success(&format!("Key imported ({fingerprint})"));
    if session.identity().own_fingerprint().as_ref() == Some(&fingerprint) {
        output::detail("This is your own key; messages are always encrypted to you anyway.");
    }
    session.audit(AuditAction::KeyImport, vec![fingerprint.to_string()], label);
    Ok(())
}

fn execute_reject(session: &Session, file: &Path) -> Result<()> {
    let armored = read_file(file)?;
    let fingerprint = session.trust().reject_key(&armored)?;

    output::success(&format!("Key rejected ({fingerprint}); it will not be offered again"));
    session.audit(AuditAction::KeyReject, vec![fingerprint.to_string()], None);
    Ok(())
}

fn execute_remove(session: &Session, position: usize) -> Result<()> {
    let index = to_index(session, position)?;
    let removed = session.keys.remove_at(index)?;

    output::success(&format!("Removed {}", removed));
    session.audit(
        AuditAction::KeyRemove,
        vec![removed.fingerprint.to_string()],
        Some(removed.label),
    );
    Ok(())
}

fn execute_rename(session: &Session, position: usize, label: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(SealroomError::InvalidConfig {
            detail: "Label must not be empty".into(),
        });
    }
    let index = to_index(session, position)?;
    session.keys.relabel(index, label)?;

    let fingerprints: Vec<String> = session
        .keys
        .records()?
        .get(index)
        .map(|r| r.fingerprint.to_string())
        .into_iter()
        .collect();
    output::success(&format!("Renamed #{position} to '{}'", label.trim()));
    session.audit(
        AuditAction::KeyRename,
        fingerprints,
        Some(label.trim().to_string()),
    );
    Ok(())
}

fn execute_clear(session: &Session, yes: bool) -> Result<()> {
    if !yes {
        return Err(SealroomError::InvalidConfig {
            detail: "This removes every trusted recipient. Re-run with --yes to confirm.".into(),
        });
    }

    let removed: Vec<String> = session
        .keys
        .records()?
        .into_iter()
        .map(|r| r.fingerprint.to_string())
        .collect();
    session.keys.clear_all()?;

    output::success(&format!("Removed {} recipients", removed.len()));
    output::detail("Decided-on keys stay hidden from offers.");
    session.audit(AuditAction::KeysClear, removed, None);
    Ok(())
}
