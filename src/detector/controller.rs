use std::collections::HashMap;

use log::{debug, info, warn};

use crate::{guard::DailyGuard, service::RecordService};

use super::session::WatchSession;

/// Stable identity of an observed player element, assigned by the embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

/// Playback notifications for a single player element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    /// Periodic position report during playback.
    TimeUpdate { position: f64, duration: Option<f64> },
    /// Playback started or resumed.
    Play { position: f64 },
    /// Playback paused; carries one final position report.
    Pause { position: f64, duration: Option<f64> },
    /// A seek is in progress.
    Seeking { position: f64 },
    /// Playback reached the end of the media.
    Ended,
    /// The element left the document; its session is discarded.
    Removed,
}

/// Watches player elements and turns qualifying sessions into at most one
/// ledger record per day. Sessions live in an arena keyed by element
/// identity; the daily guard suppresses duplicate records no matter how
/// many elements qualify.
pub struct WatchDetector {
    sessions: HashMap<ElementId, WatchSession>,
    guard: DailyGuard,
    service: RecordService,
}

impl WatchDetector {
    pub fn new(guard: DailyGuard, service: RecordService) -> Self {
        Self {
            sessions: HashMap::new(),
            guard,
            service,
        }
    }

    /// Number of elements currently observed.
    pub fn watched_elements(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, element: ElementId) -> Option<&WatchSession> {
        self.sessions.get(&element)
    }

    pub async fn handle_event(&mut self, element: ElementId, event: PlayerEvent) {
        let trigger_reason = match event {
            PlayerEvent::Removed => {
                if self.sessions.remove(&element).is_some() {
                    debug!("Detached watcher from element {}", element.0);
                }
                return;
            }
            PlayerEvent::TimeUpdate { position, duration }
            | PlayerEvent::Pause { position, duration } => {
                let session = self.session_mut(element);
                if session.observe_position(position, duration) {
                    Some(describe_progress(session.watched_secs(), duration))
                } else {
                    None
                }
            }
            PlayerEvent::Play { position } => {
                self.session_mut(element).note_resume(position);
                None
            }
            PlayerEvent::Seeking { position } => {
                self.session_mut(element).note_seek(position);
                None
            }
            PlayerEvent::Ended => {
                if self.session_mut(element).note_ended() {
                    Some("ended".to_string())
                } else {
                    None
                }
            }
        };

        if let Some(reason) = trigger_reason {
            self.try_record(&reason).await;
        }
    }

    /// Cross-context "player ended" notification, e.g. from an embedded
    /// player in another browsing context. Page-level: consults the guard
    /// and records without touching any element session.
    pub async fn handle_external_ended(&self) {
        self.try_record("external-ended").await;
    }

    fn session_mut(&mut self, element: ElementId) -> &mut WatchSession {
        self.sessions.entry(element).or_insert_with(|| {
            debug!("Attached watcher to element {}", element.0);
            WatchSession::new()
        })
    }

    async fn try_record(&self, reason: &str) {
        if self.guard.has_recorded_today() {
            debug!("Already recorded today, skipping ({reason})");
            return;
        }

        match self.service.record_today(Some(reason)).await {
            Ok(outcome) => {
                info!("View recorded for {} ({reason})", outcome.key);
                if let Err(err) = self.guard.mark_recorded_today() {
                    warn!("Failed to persist daily guard flag: {err}");
                }
            }
            Err(err) => {
                // Guard stays unmarked so another element or page may still
                // succeed; this session does not retry.
                warn!("Record attempt skipped: {err}");
            }
        }
    }
}

fn describe_progress(watched_secs: f64, duration: Option<f64>) -> String {
    let watched = watched_secs.round() as i64;
    match duration {
        Some(duration) if duration > 0.0 => {
            format!(
                "watched {watched}s ({:.0}%)",
                watched_secs / duration * 100.0
            )
        }
        _ => format!("watched {watched}s (no duration)"),
    }
}
