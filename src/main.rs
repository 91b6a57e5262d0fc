mod adapters;
mod cli;
mod config;
mod core;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};

fn main() {
    let args = Cli::parse();

    cli::context::init(args.data_dir.as_deref());
    cli::output::set_quiet(args.quiet);
    init_tracing(args.verbose);

    let result = match &args.command {
        Commands::Init => cli::commands::init::execute(args.verbose),
        Commands::Identity { action } => cli::commands::identity::execute(action),
        Commands::Keys { action } => cli::commands::keys::execute(action),
        Commands::Read {
            file,
            unlock,
            offers,
        } => cli::commands::read::execute(file, unlock, *offers),
        Commands::Fetch {
            unlock,
            room,
            offers,
        } => cli::commands::fetch::execute(unlock, room, *offers),
        Commands::Watch {
            unlock,
            room,
            offers,
        } => cli::commands::watch::execute(unlock, room, *offers),
        Commands::Send {
            text,
            image,
            unlock,
            room,
        } => cli::commands::send::execute(text, image.as_deref(), unlock, room),
        Commands::Backup { action } => cli::commands::backup::execute(action),
        Commands::Log { last } => cli::commands::log::execute(*last),
    };

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "sealroom=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
