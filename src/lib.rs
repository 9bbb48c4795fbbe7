//! Daily watch-activity tracking with streak/heatmap aggregation.
//!
//! Three cooperating pieces mirror the runtime split of the system this
//! crate models: a background [`RecordService`] owning the persistent
//! activity ledger behind a serialized message interface, a
//! [`WatchDetector`] that turns playback events into at most one recorded
//! view per day, and the pure [`stats`] layer that renders a ledger
//! snapshot into streak and heatmap data.

pub mod daykey;
pub mod detector;
pub mod error;
pub mod guard;
pub mod service;
pub mod stats;
pub mod store;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

pub use detector::{ElementId, PlayerEvent, WatchDetector, WatchPhase, WatchSession};
pub use error::ServiceError;
pub use guard::DailyGuard;
pub use service::{RecordService, Request, Response};
pub use store::{Ledger, RecordOutcome, Storage, XP_PER_VIEW};

const LEDGER_DB_FILE: &str = "streak.sqlite3";

/// Owns the background half of the tracker: the storage worker and the
/// record service in front of it.
pub struct StreakTracker {
    storage: Storage,
    service: RecordService,
}

impl StreakTracker {
    /// Opens (or creates) the data directory and the ledger store inside it.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let storage = Storage::new(data_dir.join(LEDGER_DB_FILE))?;
        let service = RecordService::new(storage.clone());

        info!("Streak tracker ready at {}", data_dir.display());

        Ok(Self { storage, service })
    }

    pub fn service(&self) -> RecordService {
        self.service.clone()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Builds a detector bound to this tracker's service. `flags_path` is
    /// the per-device daily-guard file, kept separate from the ledger.
    pub fn detector(&self, flags_path: PathBuf) -> Result<WatchDetector> {
        let guard = DailyGuard::new(flags_path)?;
        Ok(WatchDetector::new(guard, self.service.clone()))
    }
}
