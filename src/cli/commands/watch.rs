use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::adapters::transport::http_room::HttpRoom;
use crate::cli::commands::offers;
use crate::cli::commands::session::{self, Session};
use crate::cli::{OfferMode, RoomArgs, UnlockArgs, output};
use crate::core::errors::Result;
use crate::core::models::render_item::PipelineReport;
use crate::core::traits::transport::RoomTransport;

/// Execute the `sealroom watch` command.
///
/// Polls the room every `[poll] interval_secs` until Ctrl-C. Passes never
/// overlap: a tick that fires during a slow pass is skipped. While the room
/// is unchanged only the still undecided key offers are asked again. Transport
/// failures are retried on the next tick; a locked key or broken store
/// ends the loop.
pub fn execute(unlock: &UnlockArgs, room_args: &RoomArgs, mode: OfferMode) -> Result<()> {
    let session = Session::open()?;
    let room = session.room(room_args)?;
    let period = Duration::from_secs(session.config.poll.interval_secs);

    output::header(&format!(
        "sealroom watch (every {}s, Ctrl-C to stop)",
        period.as_secs()
    ));

    session::runtime()?.block_on(poll_loop(&session, &room, unlock, mode, period))
}

async fn poll_loop(
    session: &Session,
    room: &HttpRoom,
    unlock: &UnlockArgs,
    mode: OfferMode,
    period: Duration,
) -> Result<()> {
    let passphrase = unlock.secret();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last: Option<(String, PipelineReport)> = None;

    // One listener for the whole run: a Ctrl-C during a pass is still
    // pending at the next select.
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            biased;
            _ = &mut ctrl_c => {
                println!();
                output::success("Stopped");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        let content = match room.fetch_messages().await {
            Ok(content) => content,
            Err(e) => {
                output::warning(&format!("{e} (retrying in {}s)", period.as_secs()));
                continue;
            }
        };

        if let Some((seen, report)) = &last {
            if *seen == content {
                tracing::debug!("room unchanged");
                offers::resolve(session, report, mode)?;
                continue;
            }
        }

        match offers::run_pass(session, &content, passphrase.as_ref(), mode) {
            Ok(report) => {
                tracing::debug!(
                    items = report.items.len(),
                    failures = report.decrypt_errors(),
                    "pass complete"
                );
                last = Some((content, report));
            }
            Err(e) if e.is_fatal_to_run() => return Err(e),
            Err(e) => output::warning(&e.to_string()),
        }
    }
}
