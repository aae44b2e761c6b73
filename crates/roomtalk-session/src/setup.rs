//! Config loading and persisted client state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::error::SessionError;
use crate::profile::SessionProfile;

const IDENTITY_FILE: &str = "identity.toml";

/// Identity and room remembered between runs.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedIdentity {
    #[serde(default)]
    identity: Option<String>,
    #[serde(default)]
    room: Option<String>,
}

/// Load configuration from the given path, or the default location.
pub fn load_config(path: Option<&str>) -> Result<Config, SessionError> {
    let config_path = match path {
        Some(p) => PathBuf::from(p),
        None => default_config_path(),
    };

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| SessionError::Config(format!("failed to read config: {e}")))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| SessionError::Config(format!("failed to parse config: {e}")))?;
        info!(path = %config_path.display(), "loaded config");
        Ok(config)
    } else {
        info!("no config file found, using defaults");
        Ok(Config::default())
    }
}

/// Load the remembered identity and room.
///
/// Returns `None` if either is missing or blank; the caller must then ask
/// the user who they are.
pub fn load_profile(config_dir: &Path) -> Result<Option<SessionProfile>, SessionError> {
    let path = config_dir.join(IDENTITY_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| SessionError::Config(format!("failed to read identity: {e}")))?;
    let saved: SavedIdentity = toml::from_str(&content)
        .map_err(|e| SessionError::Config(format!("failed to parse identity: {e}")))?;

    match (saved.identity, saved.room) {
        (Some(identity), Some(room)) => Ok(SessionProfile::new(&identity, &room).ok()),
        _ => Ok(None),
    }
}

/// Remember `profile` for later runs.
pub fn save_profile(config_dir: &Path, profile: &SessionProfile) -> Result<(), SessionError> {
    std::fs::create_dir_all(config_dir)
        .map_err(|e| SessionError::Config(format!("failed to create config dir: {e}")))?;
    let saved = SavedIdentity {
        identity: Some(profile.identity.clone()),
        room: Some(profile.room.clone()),
    };
    let content = toml::to_string_pretty(&saved)
        .map_err(|e| SessionError::Config(format!("failed to encode identity: {e}")))?;
    let path = config_dir.join(IDENTITY_FILE);
    std::fs::write(&path, content)
        .map_err(|e| SessionError::Config(format!("failed to write identity: {e}")))?;
    info!(identity = %profile.identity, room = %profile.room, "saved identity");
    Ok(())
}

/// Forget the remembered identity and room.
pub fn forget_profile(config_dir: &Path) -> Result<(), SessionError> {
    let path = config_dir.join(IDENTITY_FILE);
    if path.exists() {
        std::fs::remove_file(&path)
            .map_err(|e| SessionError::Config(format!("failed to remove identity: {e}")))?;
        info!("forgot saved identity");
    }
    Ok(())
}

/// Get the default config directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("roomtalk")
}

/// Get the default config file path.
fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}
