pub mod snapshot;
pub mod writer;

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tracing::{info, warn};

pub use snapshot::Snapshot;

/// File-backed snapshot store. One JSON document, no external engine.
#[derive(Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Best-effort load. A missing or unreadable file yields empty defaults
    /// so startup never fails on persistence problems.
    pub fn load(&self) -> Snapshot {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no snapshot at {}, starting empty", self.path.display());
                return Snapshot::default();
            }
            Err(e) => {
                warn!("cannot read snapshot {}: {}", self.path.display(), e);
                return Snapshot::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "corrupt snapshot {}, starting empty: {}",
                    self.path.display(),
                    e
                );
                Snapshot::default()
            }
        }
    }

    /// Write the full snapshot. Goes through a sibling temp file and a
    /// rename so a crash mid-write never truncates the previous document.
    /// Temp names are unique per call: two writers hitting the same store
    /// never interleave inside one temp file, the later rename just wins.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension(format!(
            "json.tmp.{}.{}",
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&tmp, json)
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("renaming into {}", self.path.display()))?;
        Ok(())
    }
}
