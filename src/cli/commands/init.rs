use crate::cli::commands::{audit_helpers, session};
use crate::cli::{context, output};
use crate::config::app_config::{AppConfig, DEFAULT_CONFIG};
use crate::core::errors::{Result, SealroomError};
use crate::core::models::audit_entry::AuditAction;

/// Execute the `sealroom init` command.
///
/// Creates the data directory with a default `config.toml`. Keys are set
/// up separately with `sealroom identity`.
pub fn execute(verbose: bool) -> Result<()> {
    let dir = context::data_dir();
    let config_path = dir.join("config.toml");

    if config_path.exists() {
        return Err(SealroomError::InvalidConfig {
            detail: format!("Sealroom is already initialized ({} exists)", config_path.display()),
        });
    }

    output::header("Sealroom — Initializing");

    std::fs::create_dir_all(dir)?;
    output::success(&format!("Created {}", dir.display()));

    std::fs::write(&config_path, DEFAULT_CONFIG)?;
    output::success("Generated config.toml with defaults");

    let config = AppConfig::load(dir)?;
    audit_helpers::log_audit(
        dir,
        &config,
        AuditAction::Init,
        vec![],
        Some("data directory initialized".to_string()),
        None,
    );

    if session::gpg().is_available() {
        output::success("gpg found");
    } else {
        output::warning("gpg not found in PATH; install GnuPG 2.2+ before using keys");
    }

    print_next_steps(verbose);
    Ok(())
}

fn print_next_steps(verbose: bool) {
    if output::is_quiet() {
        return;
    }
    println!("\n  Next steps:");
    println!("    1. Set room.server_url in config.toml");
    println!("    2. sealroom identity generate --passphrase ...");
    println!("    3. sealroom fetch --password ... --passphrase ...");

    if verbose {
        println!("\n  Environment variables:");
        println!("    SEALROOM_DIR            data directory");
        println!("    SEALROOM_PASSPHRASE     private key passphrase");
        println!("    SEALROOM_ROOM_PASSWORD  room password");
        println!("    SEALROOM_GPG            gpg binary (default: gpg on PATH)");
    }
}
