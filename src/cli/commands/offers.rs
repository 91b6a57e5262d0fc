use std::io::{self, BufRead, Write};

use colored::Colorize;
use secrecy::SecretString;

use crate::cli::commands::session::Session;
use crate::cli::{OfferMode, context, output, render};
use crate::core::errors::Result;
use crate::core::models::audit_entry::AuditAction;
use crate::core::models::render_item::{KeyOffer, PipelineReport};
use crate::core::services::key_store::KeyStore;
use crate::core::services::trust_workflow::{Decision, DecisionHandler};
use crate::core::traits::key_value::KeyValueStore;

/// Asks on stdin. End of input or an unknown answer defers.
pub struct PromptHandler<R: BufRead> {
    input: R,
}

impl<R: BufRead> PromptHandler<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> DecisionHandler for PromptHandler<R> {
    fn decide(&mut self, offer: &KeyOffer) -> Decision {
        println!("\n  {} New public key in the room", "🔑".yellow());
        println!("    {}", render::describe_offer(offer));
        print!("  Import it? [y]es / [r]eject / [s]kip (default: skip): ");
        let _ = io::stdout().flush();

        let mut answer = String::new();
        if self.input.read_line(&mut answer).is_err() {
            return Decision::Defer;
        }
        parse_answer(&answer)
    }
}

fn parse_answer(answer: &str) -> Decision {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "i" | "import" => Decision::Import,
        "r" | "reject" | "n" | "no" => Decision::Reject,
        _ => Decision::Defer,
    }
}

/// Lists offers and decides nothing.
pub struct IgnoreHandler;

impl DecisionHandler for IgnoreHandler {
    fn decide(&mut self, offer: &KeyOffer) -> Decision {
        output::warning(&format!("New public key: {}", render::describe_offer(offer)));
        Decision::Defer
    }
}

/// Offers in `report` the user has not decided on yet.
///
/// A report can outlive the pass that built it (`watch` reuses it while
/// the room is unchanged), so decisions made since are checked again.
pub fn pending<'r, S: KeyValueStore>(
    keys: &KeyStore<S>,
    report: &'r PipelineReport,
) -> Result<Vec<&'r KeyOffer>> {
    let mut pending = Vec::new();
    for offer in report.offers() {
        if !keys.is_hidden(&offer.fingerprint)? {
            pending.push(offer);
        }
    }
    Ok(pending)
}

/// Apply the user's decisions to every pending offer in `report`.
pub fn resolve(session: &Session, report: &PipelineReport, mode: OfferMode) -> Result<()> {
    let offers = pending(&session.keys, report)?;
    if offers.is_empty() {
        return Ok(());
    }

    let outcomes = match mode {
        OfferMode::Ask => {
            let stdin = io::stdin();
            let mut handler = PromptHandler::new(stdin.lock());
            session.trust().resolve_offers(offers, &mut handler)
        }
        OfferMode::Ignore => session.trust().resolve_offers(offers, &mut IgnoreHandler),
    };

    for outcome in outcomes {
        let fingerprint = outcome.fingerprint.to_string();
        match (outcome.decision, outcome.result) {
            (Decision::Defer, _) => {}
            (decision, Err(e)) => {
                output::warning(&format!("Could not apply {decision:?} to {fingerprint}: {e}"));
            }
            (Decision::Import, Ok(())) => {
                output::success(&format!("Imported {fingerprint}"));
                session.audit(AuditAction::KeyImport, vec![fingerprint], Some("from room".into()));
            }
            (Decision::Reject, Ok(())) => {
                output::success(&format!("Rejected {fingerprint}"));
                session.audit(AuditAction::KeyReject, vec![fingerprint], Some("from room".into()));
            }
        }
    }
    Ok(())
}

/// One pipeline pass: decrypt, print, then settle key offers.
///
/// Fatal errors (locked key, storage) propagate; everything else has
/// already been reported per item.
pub fn run_pass(
    session: &Session,
    content: &str,
    passphrase: Option<&SecretString>,
    mode: OfferMode,
) -> Result<PipelineReport> {
    let report = session.pipeline().process(content, passphrase)?;
    render::print_report(&report, &context::images_dir());
    resolve(session, &report, mode)?;
    Ok(report)
}
