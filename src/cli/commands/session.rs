use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::adapters::crypto::gpg_provider::GpgProvider;
use crate::adapters::sanitizer::tag_allowlist::TagAllowlist;
use crate::adapters::storage::json_file_store::JsonFileStore;
use crate::adapters::transport::http_room::HttpRoom;
use crate::cli::commands::audit_helpers;
use crate::cli::{RoomArgs, context};
use crate::config::app_config::AppConfig;
use crate::core::errors::{Result, SealroomError};
use crate::core::models::audit_entry::AuditAction;
use crate::core::services::identity::IdentityService;
use crate::core::services::key_store::KeyStore;
use crate::core::services::pipeline::DecryptionPipeline;
use crate::core::services::trust_workflow::TrustWorkflow;

/// Everything a command needs, wired to the on-disk adapters.
pub struct Session {
    pub dir: &'static Path,
    pub config: AppConfig,
    pub keys: KeyStore<JsonFileStore>,
    pub crypto: GpgProvider,
    pub sanitizer: TagAllowlist,
}

impl Session {
    /// Open the initialized data directory.
    pub fn open() -> Result<Self> {
        let dir = context::require_initialized()?;
        let config = AppConfig::load(dir)?;
        tracing::debug!(dir = %dir.display(), "session opened");

        Ok(Self {
            dir,
            config,
            keys: KeyStore::new(JsonFileStore::new(dir.to_path_buf())),
            crypto: gpg(),
            sanitizer: TagAllowlist::default(),
        })
    }

    pub fn identity(&self) -> IdentityService<'_, JsonFileStore, GpgProvider> {
        IdentityService::new(self.keys.backend(), &self.crypto)
    }

    pub fn trust(&self) -> TrustWorkflow<'_, JsonFileStore, GpgProvider> {
        TrustWorkflow::new(&self.keys, &self.crypto)
    }

    pub fn pipeline(&self) -> DecryptionPipeline<'_, JsonFileStore, GpgProvider, TagAllowlist> {
        DecryptionPipeline::new(&self.keys, &self.crypto, &self.sanitizer)
    }

    /// HTTP client for the configured room.
    pub fn room(&self, args: &RoomArgs) -> Result<HttpRoom> {
        let url = self.config.server_url()?;
        let password = args
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| SealroomError::InvalidConfig {
                detail: "A room password is required.\n\n  \
                         Pass it with --password or set SEALROOM_ROOM_PASSWORD."
                    .into(),
            })?;

        HttpRoom::new(
            url,
            SecretString::from(password),
            self.config.room.cookie.clone(),
        )
    }

    /// Record a trust-store event with the current state hash.
    pub fn audit(&self, action: AuditAction, fingerprints: Vec<String>, detail: Option<String>) {
        let state_hash = self.keys.state_hash().ok();
        audit_helpers::log_audit(
            self.dir,
            &self.config,
            action,
            fingerprints,
            detail,
            state_hash,
        );
    }
}

/// The gpg binary from `SEALROOM_GPG`, else `gpg` on PATH.
pub fn gpg() -> GpgProvider {
    std::env::var_os("SEALROOM_GPG")
        .map(PathBuf::from)
        .map_or_else(GpgProvider::new, GpgProvider::with_path)
}

/// Current-thread runtime for the room transport.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| SealroomError::TransportFailed {
            reason: format!("Failed to create async runtime: {e}"),
        })
}
