use std::path::Path;

use colored::Colorize;

use crate::adapters::transport::http_room::HttpRoom;
use crate::cli::commands::session::{self, Session};
use crate::cli::{RoomArgs, UnlockArgs, output};
use crate::core::errors::{Result, SealroomError};
use crate::core::models::audit_entry::AuditAction;
use crate::core::models::compose::{ComposeContext, SealedMessage};
use crate::core::services::compose::ComposeService;
use crate::core::traits::transport::RoomTransport;

/// Execute the `sealroom send` command.
///
/// Posts our public key, then the message encrypted to us and every
/// trusted recipient.
pub fn execute(
    text: &str,
    image: Option<&Path>,
    unlock: &UnlockArgs,
    room_args: &RoomArgs,
) -> Result<()> {
    let session = Session::open()?;
    let room = session.room(room_args)?;

    let mut ctx = ComposeContext::text(text);
    if let Some(path) = image {
        let bytes = std::fs::read(path).map_err(|_| SealroomError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        ctx = ctx.with_image(bytes);
    }

    let username = session.config.room.username.as_str();
    let sealed = ComposeService::new(&session.keys, &session.crypto).seal(
        username,
        &ctx,
        unlock.secret().as_ref(),
    )?;

    let spinner = output::spinner("Posting to the room...");
    let result = session::runtime()?.block_on(post(&room, &sealed));
    spinner.finish_and_clear();
    result?;

    output::success(&format!(
        "Sent as {} to {} recipient(s)",
        username.cyan(),
        sealed.recipient_count
    ));
    if sealed.recipient_count == 1 {
        output::detail("Only you can read it. Import keys with 'sealroom keys import'.");
    }

    session.audit(
        AuditAction::MessageSend,
        vec![],
        Some(format!("{} recipient(s)", sealed.recipient_count)),
    );
    Ok(())
}

/// Key first, so members can import it before they see the message.
async fn post(room: &HttpRoom, sealed: &SealedMessage) -> Result<()> {
    room.send(&sealed.public_key).await?;
    room.send(&sealed.message).await
}
