use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::core::errors::{Result, SealroomError};

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the global data directory.
/// If `custom` is provided, uses that path; otherwise the platform data dir.
pub fn init(custom: Option<&Path>) {
    let dir = custom.map(Path::to_path_buf).unwrap_or_else(default_data_dir);
    let _ = DATA_DIR.set(dir);
}

/// `<platform data dir>/sealroom`, or `.sealroom` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("sealroom"))
        .unwrap_or_else(|| PathBuf::from(".sealroom"))
}

/// Get the current data directory.
pub fn data_dir() -> &'static Path {
    DATA_DIR.get_or_init(default_data_dir).as_path()
}

/// Directory decrypted images are written to.
pub fn images_dir() -> PathBuf {
    data_dir().join("images")
}

/// Fail unless `sealroom init` has run for the data directory.
pub fn require_initialized() -> Result<&'static Path> {
    let dir = data_dir();
    if !dir.join("config.toml").exists() {
        return Err(SealroomError::InvalidConfig {
            detail: format!(
                "Sealroom is not initialized in {}. Run 'sealroom init' first.",
                dir.display()
            ),
        });
    }
    Ok(dir)
}

/// Reject names that could escape the data directory.
pub fn validate_simple_filename(name: &str, what: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(SealroomError::InvalidConfig {
            detail: format!("Invalid {what} '{name}': must be a plain file name"),
        });
    }
    Ok(())
}
