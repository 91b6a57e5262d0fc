pub mod commands;
pub mod context;
pub mod output;
pub mod render;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use secrecy::SecretString;

/// End-to-end encrypted OpenPGP chat rooms from the terminal.
#[derive(Parser, Debug)]
#[command(name = "sealroom", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory (keys, trust store, config, audit log)
    #[arg(long, global = true, env = "SEALROOM_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode: only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Passphrase of the stored private key.
#[derive(Args, Debug, Clone, Default)]
pub struct UnlockArgs {
    /// Passphrase for your private key
    #[arg(long, env = "SEALROOM_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,
}

impl UnlockArgs {
    pub fn secret(&self) -> Option<SecretString> {
        self.passphrase.clone().map(SecretString::from)
    }
}

/// Room credentials.
#[derive(Args, Debug, Clone, Default)]
pub struct RoomArgs {
    /// Room password sent to the server
    #[arg(long, env = "SEALROOM_ROOM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// What to do with public keys seen in the room.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OfferMode {
    /// Prompt for each new key
    #[default]
    Ask,
    /// Show new keys but decide nothing
    Ignore,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and a default config
    Init,

    /// Manage your own key pair
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },

    /// Manage trusted recipient keys
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Decrypt a saved room transcript
    Read {
        /// File with room content (markup or plain text)
        file: PathBuf,
        #[command(flatten)]
        unlock: UnlockArgs,
        /// How to handle new public keys
        #[arg(long, value_enum, default_value_t)]
        offers: OfferMode,
    },

    /// Fetch and decrypt the room once
    Fetch {
        #[command(flatten)]
        unlock: UnlockArgs,
        #[command(flatten)]
        room: RoomArgs,
        /// How to handle new public keys
        #[arg(long, value_enum, default_value_t)]
        offers: OfferMode,
    },

    /// Poll the room until interrupted
    Watch {
        #[command(flatten)]
        unlock: UnlockArgs,
        #[command(flatten)]
        room: RoomArgs,
        /// How to handle new public keys
        #[arg(long, value_enum, default_value_t)]
        offers: OfferMode,
    },

    /// Encrypt, sign and post a message
    Send {
        /// Message text
        text: String,
        /// Attach an image
        #[arg(long)]
        image: Option<PathBuf>,
        #[command(flatten)]
        unlock: UnlockArgs,
        #[command(flatten)]
        room: RoomArgs,
    },

    /// Save or restore identity and trust store
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Show trust-store history
    Log {
        /// Show last N entries
        #[arg(long)]
        last: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum IdentityAction {
    /// Generate a new key pair (curve25519)
    Generate {
        /// Name in the user ID
        #[arg(long, default_value = "Anonymous")]
        name: String,
        /// Email in the user ID
        #[arg(long, default_value = "anon@example.com")]
        email: String,
        /// Replace an existing key pair
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        unlock: UnlockArgs,
    },
    /// Import your armored private key
    ImportPrivate {
        /// File with the armored private key
        file: PathBuf,
    },
    /// Import your armored public key
    ImportPublic {
        /// File with the armored public key
        file: PathBuf,
    },
    /// Show your fingerprint
    Show,
    /// Print your armored public key
    ExportPublic {
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeysAction {
    /// List trusted recipients
    List,
    /// Trust a public key from a file
    Import {
        /// File with an armored public key
        file: PathBuf,
        /// Label (default: file name)
        #[arg(long)]
        label: Option<String>,
    },
    /// Distrust a public key and never offer it again
    Reject {
        /// File with an armored public key
        file: PathBuf,
    },
    /// Remove the recipient at a position shown by 'keys list'
    Remove {
        /// Position, starting at 1
        position: usize,
    },
    /// Change the label of a recipient
    Rename {
        /// Position, starting at 1
        position: usize,
        /// New label
        label: String,
    },
    /// Remove every recipient
    Clear {
        /// Confirm
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum BackupAction {
    /// Write a backup file
    Save {
        /// Destination file
        file: PathBuf,
    },
    /// Restore from a backup file
    Load {
        /// Backup file
        file: PathBuf,
    },
}
