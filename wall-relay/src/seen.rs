use crate::state::{load_json, save_json};
use crate::types::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SeenFile {
    #[serde(default)]
    seen: Vec<String>,
}

/// Ledger of post ids that were already delivered.
///
/// Ids are kept in insertion order so `persist` can drop the oldest ones once
/// the ledger grows past its cap.
#[derive(Debug, Default)]
pub struct SeenSet {
    order: VecDeque<String>,
    members: HashSet<String>,
    path: Option<PathBuf>,
}

impl SeenSet {
    /// A ledger that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Self {
        let file: SeenFile = load_json(path);
        let mut set = Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        };
        for id in file.seen {
            set.add(id);
        }
        info!("Loaded {} seen ids from {}", set.len(), path.display());
        set
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Record `id` as delivered. Re-adding a known id keeps its original position.
    pub fn add(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.members.insert(id.clone()) {
            self.order.push_back(id);
        }
    }

    /// Keep only the `cap` most recently added ids, then write them out.
    pub fn persist(&mut self, cap: usize) -> Result<()> {
        self.truncate_to(cap);
        if let Some(path) = &self.path {
            let file = SeenFile {
                seen: self.order.iter().cloned().collect(),
            };
            save_json(path, &file)?;
            debug!("Persisted {} seen ids", file.seen.len());
        }
        Ok(())
    }

    fn truncate_to(&mut self, cap: usize) {
        while self.order.len() > cap {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}
