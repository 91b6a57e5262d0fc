use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use secrecy::{ExposeSecret, SecretString};
use tempfile::TempDir;

use super::armor::{ArmorLabel, dearmor};
use crate::core::errors::{Result, SealroomError};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::pgp::{
    Decrypted, EncryptedMessage, GeneratedKeyPair, LockedKey, PublicKey, SignatureStatus,
    UnlockedKey, UserId,
};
use crate::core::traits::crypto::CryptoProvider;

/// OpenPGP provider that shells out to the system `gpg` binary.
///
/// Every operation runs against a throw-away `--homedir`, so the user's
/// own keyring is never read or modified. Keys only exist as the armored
/// text handed in through the port.
pub struct GpgProvider {
    gpg_path: PathBuf,
}

impl GpgProvider {
    pub fn new() -> Self {
        Self {
            gpg_path: PathBuf::from("gpg"),
        }
    }

    pub fn with_path(gpg_path: PathBuf) -> Self {
        Self { gpg_path }
    }

    /// Check if gpg can be executed at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.gpg_path)
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn session(&self) -> Result<GpgSession<'_>> {
        let home = tempfile::Builder::new()
            .prefix("sealroom-gpg-")
            .tempdir()
            .map_err(|e| SealroomError::CryptoUnavailable {
                reason: format!("cannot create temporary gpg home: {e}"),
            })?;
        Ok(GpgSession {
            gpg: &self.gpg_path,
            home,
        })
    }
}

impl Default for GpgProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// One ephemeral keyring.
struct GpgSession<'a> {
    gpg: &'a Path,
    home: TempDir,
}

impl GpgSession<'_> {
    fn run(&self, args: &[&str], stdin_data: Option<&[u8]>) -> Result<Output> {
        let mut cmd = Command::new(self.gpg);
        cmd.arg("--homedir")
            .arg(self.home.path())
            .args(["--batch", "--no-tty", "--quiet", "--no-greeting"])
            .args(args)
            .stdin(if stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| SealroomError::CryptoUnavailable {
            reason: format!("failed to run {}: {e}", self.gpg.display()),
        })?;

        if let Some(data) = stdin_data
            && let Some(mut stdin) = child.stdin.take()
        {
            stdin
                .write_all(data)
                .map_err(|e| SealroomError::CryptoUnavailable {
                    reason: format!("failed to write to gpg stdin: {e}"),
                })?;
        }

        child
            .wait_with_output()
            .map_err(|e| SealroomError::CryptoUnavailable {
                reason: format!("gpg process failed: {e}"),
            })
    }

    /// Run with the passphrase on fd 0 via loopback pinentry.
    fn run_with_passphrase(&self, args: &[&str], passphrase: &str) -> Result<Output> {
        let mut full = vec!["--pinentry-mode", "loopback", "--passphrase-fd", "0"];
        full.extend_from_slice(args);
        self.run(&full, Some(format!("{passphrase}\n").as_bytes()))
    }

    fn import(&self, armored: &str) -> Result<()> {
        let out = self.run(&["--import"], Some(armored.as_bytes()))?;
        if !out.status.success() {
            return Err(SealroomError::InvalidKeyFormat {
                reason: stderr_reason(&out),
            });
        }
        Ok(())
    }

    /// Import verifier/recipient keys, skipping any gpg refuses.
    fn import_public_keys(&self, keys: &[PublicKey]) {
        for key in keys {
            if let Err(e) = self.import(&key.armored) {
                tracing::debug!(fingerprint = %key.fingerprint, error = %e, "gpg refused key");
            }
        }
    }

    fn write_file(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.home.path().join(name);
        std::fs::write(&path, contents).map_err(|e| SealroomError::CryptoUnavailable {
            reason: format!("cannot write {name} to gpg home: {e}"),
        })?;
        Ok(path)
    }

    fn show_only(&self, armored: &str, primary: &str) -> Result<KeyListing> {
        let out = self.run(
            &["--with-colons", "--import-options", "show-only", "--import"],
            Some(armored.as_bytes()),
        )?;
        let stdout = String::from_utf8_lossy(&out.stdout);
        parse_colons(&stdout, primary).ok_or_else(|| SealroomError::InvalidKeyFormat {
            reason: if out.status.success() {
                "no key found in block".to_string()
            } else {
                stderr_reason(&out)
            },
        })
    }
}

impl Drop for GpgSession<'_> {
    fn drop(&mut self) {
        // Stop the agent gpg spawned for this home before the dir goes away.
        let _ = Command::new("gpgconf")
            .arg("--homedir")
            .arg(self.home.path())
            .args(["--kill", "gpg-agent"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
}

impl CryptoProvider for GpgProvider {
    fn read_key(&self, armored: &str) -> Result<PublicKey> {
        dearmor(armored, ArmorLabel::PublicKey)
            .map_err(|reason| SealroomError::InvalidKeyFormat { reason })?;

        let listing = self.session()?.show_only(armored, "pub")?;
        Ok(PublicKey {
            armored: armored.trim().to_string(),
            fingerprint: listing.fingerprint,
            user_ids: listing.user_ids,
        })
    }

    fn read_private_key(&self, armored: &str) -> Result<LockedKey> {
        dearmor(armored, ArmorLabel::PrivateKey)
            .map_err(|reason| SealroomError::InvalidKeyFormat { reason })?;

        let listing = self.session()?.show_only(armored, "sec")?;
        Ok(LockedKey {
            armored: armored.trim().to_string(),
            fingerprint: listing.fingerprint,
        })
    }

    fn decrypt_key(&self, key: &LockedKey, passphrase: &SecretString) -> Result<UnlockedKey> {
        let session = self.session()?;
        session.import(&key.armored)?;

        let probe = session.write_file("probe.txt", b"sealroom unlock probe")?;
        let probe = probe.to_string_lossy();
        let out = session.run_with_passphrase(
            &[
                "--local-user",
                key.fingerprint.as_str(),
                "--output",
                "-",
                "--detach-sign",
                &*probe,
            ],
            passphrase.expose_secret(),
        )?;

        if !out.status.success() {
            return Err(SealroomError::UnlockFailed {
                reason: stderr_reason(&out),
            });
        }

        Ok(UnlockedKey::new(
            key.clone(),
            SecretString::from(passphrase.expose_secret().to_string()),
        ))
    }

    fn read_message(&self, armored: &str) -> Result<EncryptedMessage> {
        dearmor(armored, ArmorLabel::Message).map_err(|reason| SealroomError::DecryptFailed {
            index: 0,
            reason,
        })?;
        Ok(EncryptedMessage {
            armored: armored.trim().to_string(),
        })
    }

    fn decrypt_and_verify(
        &self,
        message: &EncryptedMessage,
        key: &UnlockedKey,
        verifiers: &[PublicKey],
    ) -> Result<Decrypted> {
        let session = self.session()?;
        session.import(&key.key.armored)?;
        session.import_public_keys(verifiers);

        let input = session.write_file("message.asc", message.armored.as_bytes())?;
        let output = session.home.path().join("message.out");
        let (input, output_arg) = (input.to_string_lossy(), output.to_string_lossy());

        let out = session.run_with_passphrase(
            &[
                "--status-fd",
                "1",
                "--output",
                &*output_arg,
                "--decrypt",
                &*input,
            ],
            key.passphrase(),
        )?;

        let status = parse_status(&String::from_utf8_lossy(&out.stdout));
        if !status.decrypted {
            return Err(SealroomError::DecryptFailed {
                index: 0,
                reason: stderr_reason(&out),
            });
        }

        let bytes = std::fs::read(&output).map_err(|e| SealroomError::DecryptFailed {
            index: 0,
            reason: format!("gpg produced no plaintext: {e}"),
        })?;

        Ok(Decrypted {
            text: String::from_utf8_lossy(&bytes).into_owned(),
            signature: status.signature,
        })
    }

    fn encrypt_and_sign(
        &self,
        plaintext: &str,
        recipients: &[PublicKey],
        signer: &UnlockedKey,
    ) -> Result<String> {
        if recipients.is_empty() {
            return Err(SealroomError::EncryptionFailed {
                reason: "No recipients provided".into(),
            });
        }

        let session = self.session()?;
        session.import(&signer.key.armored)?;
        session.import_public_keys(recipients);

        let input = session.write_file("plain.txt", plaintext.as_bytes())?;
        let input = input.to_string_lossy();

        let mut args = vec![
            "--trust-model",
            "always",
            "--armor",
            "--local-user",
            signer.fingerprint().as_str(),
            "--sign",
            "--encrypt",
        ];
        for r in recipients {
            args.extend_from_slice(&["--recipient", r.fingerprint.as_str()]);
        }
        args.extend_from_slice(&["--output", "-", &*input]);

        let out = session.run_with_passphrase(&args, signer.passphrase())?;
        if !out.status.success() {
            return Err(SealroomError::EncryptionFailed {
                reason: stderr_reason(&out),
            });
        }

        String::from_utf8(out.stdout).map_err(|e| SealroomError::EncryptionFailed {
            reason: format!("gpg output is not armored text: {e}"),
        })
    }

    fn generate_key_pair(
        &self,
        user_id: &UserId,
        passphrase: &SecretString,
    ) -> Result<GeneratedKeyPair> {
        let session = self.session()?;
        let uid = user_id.to_string();
        let pass = passphrase.expose_secret();

        let out = session.run_with_passphrase(
            &["--quick-gen-key", &uid, "future-default", "default", "never"],
            pass,
        )?;
        if !out.status.success() {
            return Err(SealroomError::EncryptionFailed {
                reason: format!("key generation failed: {}", stderr_reason(&out)),
            });
        }

        let listed = session.run(&["--with-colons", "--list-secret-keys"], None)?;
        let listing = parse_colons(&String::from_utf8_lossy(&listed.stdout), "sec").ok_or_else(
            || SealroomError::EncryptionFailed {
                reason: "generated key not found in keyring".into(),
            },
        )?;
        let fpr = listing.fingerprint.as_str();

        let public = session.run(&["--armor", "--export", fpr], None)?;
        let private =
            session.run_with_passphrase(&["--armor", "--export-secret-keys", fpr], pass)?;
        if !public.status.success() || !private.status.success() {
            return Err(SealroomError::EncryptionFailed {
                reason: "exporting the generated key failed".into(),
            });
        }

        Ok(GeneratedKeyPair {
            private_armored: String::from_utf8_lossy(&private.stdout).trim().to_string(),
            public_armored: String::from_utf8_lossy(&public.stdout).trim().to_string(),
            fingerprint: listing.fingerprint,
        })
    }

    fn name(&self) -> &str {
        "gpg"
    }
}

// ─── gpg output parsing ──────────────────────────────────────────

#[derive(Debug, PartialEq)]
struct KeyListing {
    fingerprint: Fingerprint,
    user_ids: Vec<String>,
}

/// Read the first `primary` (`pub`/`sec`) key from `--with-colons` output.
fn parse_colons(output: &str, primary: &str) -> Option<KeyListing> {
    let mut seen_primary = false;
    let mut fingerprint = None;
    let mut user_ids = Vec::new();

    for line in output.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some(kind) if kind == primary => {
                if seen_primary {
                    break;
                }
                seen_primary = true;
            }
            Some("fpr") if seen_primary && fingerprint.is_none() => {
                fingerprint = fields.get(9).and_then(|f| Fingerprint::parse(f).ok());
            }
            Some("uid") if fingerprint.is_some() => {
                if let Some(uid) = fields.get(9).filter(|u| !u.is_empty()) {
                    user_ids.push(uid.replace("\\x3a", ":"));
                }
            }
            _ => {}
        }
    }

    Some(KeyListing {
        fingerprint: fingerprint?,
        user_ids,
    })
}

#[derive(Debug, PartialEq)]
struct StatusSummary {
    decrypted: bool,
    signature: SignatureStatus,
}

/// Fold `--status-fd` lines into a decryption and signature verdict.
fn parse_status(output: &str) -> StatusSummary {
    let mut decrypted = false;
    let mut signature = SignatureStatus::Unsigned;

    for line in output.lines() {
        let Some(rest) = line.strip_prefix("[GNUPG:] ") else {
            continue;
        };
        let mut words = rest.split_whitespace();
        match words.next() {
            Some("DECRYPTION_OKAY") => decrypted = true,
            Some("BADSIG") => signature = SignatureStatus::Invalid,
            Some("ERRSIG") | Some("NO_PUBKEY") if signature == SignatureStatus::Unsigned => {
                signature = SignatureStatus::UnknownSigner;
            }
            Some("VALIDSIG") if signature != SignatureStatus::Invalid => {
                let fields: Vec<&str> = words.collect();
                // Last field is the primary key; the first may be a subkey.
                let signer = fields
                    .last()
                    .and_then(|f| Fingerprint::parse(f).ok())
                    .or_else(|| fields.first().and_then(|f| Fingerprint::parse(f).ok()));
                if let Some(signer) = signer {
                    signature = SignatureStatus::Valid { signer };
                }
            }
            _ => {}
        }
    }

    StatusSummary {
        decrypted,
        signature,
    }
}

fn stderr_reason(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .map(|l| l.trim_start_matches("gpg: ").to_string())
        .unwrap_or_else(|| format!("gpg exited with {}", out.status))
}
