use crate::cli::commands::offers;
use crate::cli::commands::session::{self, Session};
use crate::cli::{OfferMode, RoomArgs, UnlockArgs, output};
use crate::core::errors::Result;
use crate::core::traits::transport::RoomTransport;

/// Execute the `sealroom fetch` command.
pub fn execute(unlock: &UnlockArgs, room_args: &RoomArgs, mode: OfferMode) -> Result<()> {
    let session = Session::open()?;
    let room = session.room(room_args)?;

    let spinner = output::spinner("Fetching room...");
    let result = session::runtime()?.block_on(room.fetch_messages());
    spinner.finish_and_clear();
    let content = result?;

    output::header("sealroom fetch");
    let report = offers::run_pass(&session, &content, unlock.secret().as_ref(), mode)?;
    if report.is_empty() {
        output::warning("The room has no encrypted messages yet");
    }
    Ok(())
}
