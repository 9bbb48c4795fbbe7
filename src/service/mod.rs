pub mod protocol;

pub use protocol::{Request, Response};

use log::{debug, info, warn};
use serde_json::Value;

use crate::{
    daykey,
    error::ServiceError,
    store::{Ledger, RecordOutcome, Storage},
};

/// Front door for the activity ledger. Each operation ships to the storage
/// worker as one closure, so calls are processed in arrival order with a
/// single in-flight read-modify-write at a time; two record calls can never
/// lose an update to interleaving.
#[derive(Clone)]
pub struct RecordService {
    storage: Storage,
}

impl RecordService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Records one qualifying view against today's local calendar date.
    /// This is the single mutating entry point used by the watch detector.
    pub async fn record_today(&self, reason: Option<&str>) -> Result<RecordOutcome, ServiceError> {
        let key = daykey::today_key();
        let outcome = self.storage.record_view(key).await?;

        match reason {
            Some(reason) => info!(
                "Recorded {} count now {} totalXP {} ({reason})",
                outcome.key, outcome.count, outcome.total_xp
            ),
            None => info!(
                "Recorded {} count now {} totalXP {}",
                outcome.key, outcome.count, outcome.total_xp
            ),
        }

        Ok(outcome)
    }

    /// Snapshot of the ledger. A read failure resolves to an empty ledger
    /// rather than propagating; the caller just renders zeroed stats.
    pub async fn get_all(&self) -> Ledger {
        match self.storage.load().await {
            Ok(ledger) => ledger,
            Err(err) => {
                warn!("Ledger read failed, serving empty snapshot: {err}");
                Ledger::default()
            }
        }
    }

    /// Replaces the ledger with an empty map and zero total experience.
    pub async fn clear_all(&self) -> Result<(), ServiceError> {
        self.storage.save(Ledger::default()).await
    }

    /// Routes a raw message. Payloads without a parsable `action` are
    /// dropped without a response.
    pub async fn dispatch(&self, message: Value) -> Option<Response> {
        let request: Request = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(err) => {
                debug!("Ignoring malformed message: {err}");
                return None;
            }
        };

        Some(self.handle(request).await)
    }

    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::RecordToday { ts, reason } => {
                debug!("recordToday request (ts {ts})");
                match self.record_today(reason.as_deref()).await {
                    Ok(outcome) => Response::recorded(outcome),
                    Err(err) => {
                        warn!("Record failed: {err}");
                        Response::failure(err.to_string())
                    }
                }
            }
            Request::GetMap => Response::Snapshot(self.get_all().await),
            Request::ClearAll => match self.clear_all().await {
                Ok(()) => Response::cleared(),
                Err(err) => {
                    warn!("Clear failed: {err}");
                    Response::failure(err.to_string())
                }
            },
        }
    }
}
