use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Experience awarded per qualifying view.
pub const XP_PER_VIEW: u64 = 100;

/// Aggregated viewing activity: per-day view counts plus the derived
/// experience total. The map is the source of truth; `total_xp` is a cache
/// and is recomputed from the map on every load and every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(rename = "map")]
    pub days: BTreeMap<String, u32>,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
}

impl Ledger {
    /// Sum over all entries of count times [`XP_PER_VIEW`].
    pub fn recomputed_total_xp(&self) -> u64 {
        self.days
            .values()
            .map(|&count| count as u64 * XP_PER_VIEW)
            .sum()
    }

    /// Folds a legacy one-entry-per-view list into per-day counts.
    pub fn from_legacy(dates: &[String]) -> Self {
        let mut days: BTreeMap<String, u32> = BTreeMap::new();
        for key in dates {
            *days.entry(key.clone()).or_insert(0) += 1;
        }

        let mut ledger = Self { days, total_xp: 0 };
        ledger.total_xp = ledger.recomputed_total_xp();
        ledger
    }

    /// Increments the count for `day_key` (creating the entry if absent),
    /// refreshes the total, and returns the new per-day count.
    pub fn record(&mut self, day_key: &str) -> u32 {
        let count = {
            let entry = self.days.entry(day_key.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.total_xp = self.recomputed_total_xp();
        count
    }
}

/// Result of one successful record operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub key: String,
    pub count: u32,
    pub gained: u64,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
}
