use std::{collections::BTreeMap, fs, path::PathBuf, sync::RwLock};

use anyhow::{Context, Result};

use crate::daykey;

/// Per-device, per-day idempotency flags, kept in a local JSON file distinct
/// from the synced ledger. A flag is set at most once per day and never
/// cleared; entries for past days simply stop being consulted.
pub struct DailyGuard {
    path: PathBuf,
    flags: RwLock<BTreeMap<String, bool>>,
}

impl DailyGuard {
    pub fn new(path: PathBuf) -> Result<Self> {
        let flags = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read guard flags from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            flags: RwLock::new(flags),
        })
    }

    pub fn has_recorded_today(&self) -> bool {
        self.has_recorded(&daykey::today_key())
    }

    pub fn has_recorded(&self, day_key: &str) -> bool {
        self.flags
            .read()
            .unwrap()
            .get(&flag_key(day_key))
            .copied()
            .unwrap_or(false)
    }

    pub fn mark_recorded_today(&self) -> Result<()> {
        self.mark_recorded(&daykey::today_key())
    }

    pub fn mark_recorded(&self, day_key: &str) -> Result<()> {
        {
            let mut guard = self.flags.write().unwrap();
            guard.insert(flag_key(day_key), true);
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, flags: &BTreeMap<String, bool>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(flags)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write guard flags to {}", self.path.display()))
    }
}

fn flag_key(day_key: &str) -> String {
    format!("recorded_{day_key}")
}
