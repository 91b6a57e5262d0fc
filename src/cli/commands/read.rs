use std::path::Path;

use crate::cli::commands::identity::read_file;
use crate::cli::commands::offers;
use crate::cli::commands::session::Session;
use crate::cli::{OfferMode, UnlockArgs, output};
use crate::core::errors::Result;

/// Execute the `sealroom read` command.
///
/// Runs one pass over a saved copy of the room.
pub fn execute(file: &Path, unlock: &UnlockArgs, mode: OfferMode) -> Result<()> {
    let session = Session::open()?;
    let content = read_file(file)?;

    output::header(&format!("sealroom read {}", file.display()));
    let report = offers::run_pass(&session, &content, unlock.secret().as_ref(), mode)?;

    if report.is_empty() {
        output::warning("No encrypted messages or keys found");
    }
    Ok(())
}
