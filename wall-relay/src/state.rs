//! JSON files that carry relay state between runs.
//!
//! Reads never fail: a missing, unreadable or corrupt file loads as the
//! type's default. Writes go to a sibling temp file that is renamed over the
//! target, so a crash mid-write leaves the previous version intact.
use crate::types::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub fn load_json<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No state at {}, starting empty", path.display());
            return T::default();
        }
        Err(e) => {
            warn!("Cannot read {}: {}, starting empty", path.display(), e);
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Corrupt state in {}: {}, starting empty", path.display(), e);
            T::default()
        }
    }
}

pub fn save_json<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let body = serde_json::to_string_pretty(value)?;
    let tmp = temp_sibling(path);
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, path)?;

    debug!("Wrote {}", path.display());
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "state".into());
    name.push(".tmp");
    path.with_file_name(name)
}
