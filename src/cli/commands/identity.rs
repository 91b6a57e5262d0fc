use std::path::Path;

use colored::Colorize;
use secrecy::SecretString;

use crate::cli::commands::session::Session;
use crate::cli::{IdentityAction, UnlockArgs, output};
use crate::core::errors::{Result, SealroomError};
use crate::core::models::audit_entry::AuditAction;
use crate::core::models::pgp::UserId;
use crate::core::traits::crypto::CryptoProvider;

/// Execute the `sealroom identity` command.
pub fn execute(action: &IdentityAction) -> Result<()> {
    let session = Session::open()?;
    match action {
        IdentityAction::Generate {
            name,
            email,
            force,
            unlock,
        } => execute_generate(&session, name, email, *force, unlock),
        IdentityAction::ImportPrivate { file } => execute_import_private(&session, file),
        IdentityAction::ImportPublic { file } => execute_import_public(&session, file),
        IdentityAction::Show => execute_show(&session),
        IdentityAction::ExportPublic { output } => execute_export(&session, output.as_deref()),
    }
}

pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|_| SealroomError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn execute_generate(
    session: &Session,
    name: &str,
    email: &str,
    force: bool,
    unlock: &UnlockArgs,
) -> Result<()> {
    let identity = session.identity();
    if identity.private_key_armored()?.is_some() && !force {
        return Err(SealroomError::InvalidConfig {
            detail: "A key pair already exists. Use --force to replace it \
                     (save a backup first: sealroom backup save <file>)."
                .into(),
        });
    }

    let passphrase: SecretString = unlock.secret().ok_or(SealroomError::MissingPassphrase)?;
    let user_id = UserId {
        name: name.to_string(),
        email: email.to_string(),
    };

    let spinner = output::spinner("Generating curve25519 key pair...");
    let result = identity.generate(&user_id, &passphrase);
    spinner.finish_and_clear();
    let pair = result?;

    output::success(&format!("Key pair generated for {user_id}"));
    output::success(&format!("Fingerprint: {}", pair.fingerprint.to_string().cyan()));
    output::detail("Your public key is posted with every message you send.");

    session.audit(
        AuditAction::IdentityGenerate,
        vec![pair.fingerprint.to_string()],
        Some(user_id.to_string()),
    );
    Ok(())
}

fn execute_import_private(session: &Session, file: &Path) -> Result<()> {
    let armored = read_file(file)?;
    let fingerprint = session.identity().import_private(&armored)?;

    output::success(&format!("Private key imported ({fingerprint})"));
    if session.identity().public_key_armored()?.is_none() {
        output::warning("No public key stored yet: sealroom identity import-public <file>");
    }

    session.audit(
        AuditAction::IdentityImport,
        vec![fingerprint.to_string()],
        Some("private key".into()),
    );
    Ok(())
}

fn execute_import_public(session: &Session, file: &Path) -> Result<()> {
    let armored = read_file(file)?;
    let fingerprint = session.identity().import_public(&armored)?;

    output::success(&format!("Public key imported ({fingerprint})"));
    session.audit(
        AuditAction::IdentityImport,
        vec![fingerprint.to_string()],
        Some("public key".into()),
    );
    Ok(())
}

fn execute_show(session: &Session) -> Result<()> {
    let identity = session.identity();
    output::header("Your identity");

    match identity.private_key_armored()? {
        Some(_) => output::success("Private key stored"),
        None => output::warning("No private key (sealroom identity generate)"),
    }

    match identity.own_public_key()? {
        Some(key) => {
            output::success(&format!("Fingerprint: {}", key.fingerprint.to_string().cyan()));
            for uid in &key.user_ids {
                output::detail(uid);
            }
        }
        None => output::warning("No public key stored"),
    }

    println!("  Username: {}", session.config.room.username.cyan());
    println!("  Backend:  {}", session.crypto.name());
    Ok(())
}

fn execute_export(session: &Session, path: Option<&Path>) -> Result<()> {
    let armored = session
        .identity()
        .public_key_armored()?
        .ok_or(SealroomError::NoPublicKey)?;

    match path {
        Some(path) => {
            std::fs::write(path, format!("{armored}\n"))?;
            output::success(&format!("Public key written to {}", path.display()));
        }
        None => println!("{armored}"),
    }
    Ok(())
}
