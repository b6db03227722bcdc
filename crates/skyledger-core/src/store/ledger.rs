use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::memory::{Inner, MemoryStore};
use crate::error::Result;
use crate::frame::{FrameRecord, Night, Target, Tile};

const LEDGER_VERSION: u32 = 1;

/// On-disk form of a [`MemoryStore`]. Rows are sorted so the file diffs cleanly.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub frames: Vec<FrameRecord>,
    #[serde(default)]
    pub nights: Vec<Night>,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub tiles: Vec<Tile>,
}

fn default_version() -> u32 {
    LEDGER_VERSION
}

impl MemoryStore {
    pub fn snapshot(&self) -> LedgerSnapshot {
        let inner = self.inner.lock();

        let mut frames: Vec<FrameRecord> = inner.frames.values().cloned().collect();
        frames.sort_by(|a, b| a.original_filename.cmp(&b.original_filename));
        let mut targets: Vec<Target> = inner.targets.values().cloned().collect();
        targets.sort_by(|a, b| a.name.cmp(&b.name));

        LedgerSnapshot {
            version: LEDGER_VERSION,
            frames,
            nights: inner.nights.values().cloned().collect(),
            targets,
            tiles: inner.tiles.values().cloned().collect(),
        }
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let mut inner = Inner::default();
        for frame in snapshot.frames {
            inner.frames.insert(frame.original_filename.clone(), frame);
        }
        for night in snapshot.nights {
            inner.nights.insert(night.date, night);
        }
        for target in snapshot.targets {
            inner.targets.insert(target.name.clone(), target);
        }
        for tile in snapshot.tiles {
            inner.tiles.insert(tile.id, tile);
        }
        Self {
            inner: parking_lot::Mutex::new(inner),
        }
    }

    /// Load a ledger file. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "ledger file absent, starting empty");
            return Ok(Self::new());
        }
        let bytes = fs::read(path)?;
        let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes)?;
        info!(
            path = %path.display(),
            frames = snapshot.frames.len(),
            targets = snapshot.targets.len(),
            tiles = snapshot.tiles.len(),
            "ledger loaded"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the ledger to a sibling temp file, then rename it over `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        let json = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = std::path::PathBuf::from(tmp_name);

        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, path)?;
        info!(path = %path.display(), frames = snapshot.frames.len(), "ledger saved");
        Ok(())
    }
}
