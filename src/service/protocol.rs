use serde::{Deserialize, Serialize};

use crate::store::{Ledger, RecordOutcome};

/// Requests accepted by the record service, tagged by their `action` field.
/// Payloads that fail to parse into one of these variants are malformed and
/// are dropped without a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Request {
    /// Record one qualifying view against today's date.
    #[serde(rename = "recordToday")]
    RecordToday {
        /// Sender-side timestamp in milliseconds; logged, never used for
        /// day keying.
        ts: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Snapshot of the full ledger.
    #[serde(rename = "getMap", alias = "getAll")]
    GetMap,

    /// Reset the ledger to empty.
    #[serde(rename = "clearAll")]
    ClearAll,
}

/// Reply payloads. Record results and clears carry an `ok` flag, failures
/// carry `ok: false` plus an error string, and snapshots are the bare
/// ledger object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Recorded {
        ok: bool,
        #[serde(flatten)]
        outcome: RecordOutcome,
    },
    Failure {
        ok: bool,
        error: String,
    },
    Snapshot(Ledger),
    Cleared {
        ok: bool,
    },
}

impl Response {
    pub fn recorded(outcome: RecordOutcome) -> Self {
        Response::Recorded { ok: true, outcome }
    }

    pub fn failure(error: String) -> Self {
        Response::Failure { ok: false, error }
    }

    pub fn cleared() -> Self {
        Response::Cleared { ok: true }
    }
}
