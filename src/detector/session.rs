/// Minimum forward-progress seconds for a session to qualify as a view.
pub const MIN_WATCHED_SECS: f64 = 60.0;

/// Alternative qualification: fraction of a known duration watched.
pub const MIN_WATCHED_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    Idle,
    Accumulating,
    Triggered,
}

impl Default for WatchPhase {
    fn default() -> Self {
        WatchPhase::Idle
    }
}

/// Per-element watch heuristic. Forward playback progress accrues watched
/// time; backward jumps never add or subtract credit, and seeks or resumes
/// only move the anchor. `Triggered` is terminal: an element qualifies at
/// most once, no matter how playback continues afterwards.
#[derive(Debug, Clone, Default)]
pub struct WatchSession {
    phase: WatchPhase,
    watched_secs: f64,
    last_position: Option<f64>,
}

impl WatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> WatchPhase {
        self.phase
    }

    pub fn watched_secs(&self) -> f64 {
        self.watched_secs
    }

    /// Feeds a playback-position observation. The first observation only
    /// anchors the position. Returns true exactly once, when the session
    /// crosses the watch threshold.
    pub fn observe_position(&mut self, position: f64, duration: Option<f64>) -> bool {
        match self.phase {
            WatchPhase::Triggered => return false,
            WatchPhase::Idle => {
                self.phase = WatchPhase::Accumulating;
                self.last_position = Some(position);
                return false;
            }
            WatchPhase::Accumulating => {}
        }

        if let Some(last) = self.last_position {
            self.watched_secs += (position - last).max(0.0);
        }
        self.last_position = Some(position);

        if self.threshold_met(duration) {
            self.phase = WatchPhase::Triggered;
            return true;
        }

        false
    }

    /// A seek moves the anchor to the target position without crediting the
    /// jump; accumulated watched time is kept.
    pub fn note_seek(&mut self, position: f64) {
        self.reanchor(position);
    }

    /// Resuming playback re-anchors so the paused gap is not credited.
    pub fn note_resume(&mut self, position: f64) {
        self.reanchor(position);
    }

    /// An ended signal qualifies the session outright. Returns true exactly
    /// once.
    pub fn note_ended(&mut self) -> bool {
        if self.phase == WatchPhase::Triggered {
            return false;
        }
        self.phase = WatchPhase::Triggered;
        true
    }

    fn threshold_met(&self, duration: Option<f64>) -> bool {
        if self.watched_secs >= MIN_WATCHED_SECS {
            return true;
        }
        match duration {
            Some(duration) if duration > 0.0 => {
                self.watched_secs / duration >= MIN_WATCHED_FRACTION
            }
            _ => false,
        }
    }

    fn reanchor(&mut self, position: f64) {
        if self.phase == WatchPhase::Idle {
            self.phase = WatchPhase::Accumulating;
        }
        self.last_position = Some(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_forward(session: &mut WatchSession, seconds: u32, duration: Option<f64>) -> u32 {
        let mut triggers = 0;
        for position in 0..=seconds {
            if session.observe_position(position as f64, duration) {
                triggers += 1;
            }
        }
        triggers
    }

    #[test]
    fn first_observation_credits_nothing() {
        let mut session = WatchSession::new();

        assert!(!session.observe_position(42.0, None));
        assert_eq!(session.phase(), WatchPhase::Accumulating);
        assert_eq!(session.watched_secs(), 0.0);
    }

    #[test]
    fn sixty_one_forward_seconds_trigger_exactly_once() {
        let mut session = WatchSession::new();

        let triggers = feed_forward(&mut session, 61, Some(120.0));

        assert_eq!(triggers, 1);
        assert_eq!(session.phase(), WatchPhase::Triggered);
    }

    #[test]
    fn half_of_known_duration_triggers() {
        let mut session = WatchSession::new();

        let triggers = feed_forward(&mut session, 25, Some(50.0));

        assert_eq!(triggers, 1);
        assert!(session.watched_secs() < MIN_WATCHED_SECS);
    }

    #[test]
    fn fraction_rule_needs_a_positive_duration() {
        let mut session = WatchSession::new();

        let triggers = feed_forward(&mut session, 30, Some(0.0));

        assert_eq!(triggers, 0);
        assert_eq!(session.phase(), WatchPhase::Accumulating);
    }

    #[test]
    fn seek_does_not_inflate_watched_time() {
        let mut session = WatchSession::new();

        session.observe_position(0.0, None);
        session.observe_position(10.0, None);
        session.note_seek(100.0);
        session.observe_position(110.0, None);

        assert_eq!(session.watched_secs(), 20.0);
        assert_eq!(session.phase(), WatchPhase::Accumulating);
    }

    #[test]
    fn backward_seek_is_clamped_to_zero_credit() {
        let mut session = WatchSession::new();

        session.observe_position(0.0, None);
        session.observe_position(30.0, None);
        session.observe_position(5.0, None);
        session.observe_position(10.0, None);

        assert_eq!(session.watched_secs(), 35.0);
    }

    #[test]
    fn resume_skips_the_paused_gap() {
        let mut session = WatchSession::new();

        session.observe_position(0.0, None);
        session.observe_position(10.0, None);
        // Pause, then playback resumes at the same spot much later.
        session.note_resume(10.0);
        session.observe_position(15.0, None);

        assert_eq!(session.watched_secs(), 15.0);
    }

    #[test]
    fn ended_triggers_from_any_live_phase() {
        let mut idle = WatchSession::new();
        assert!(idle.note_ended());

        let mut accumulating = WatchSession::new();
        accumulating.observe_position(0.0, None);
        assert!(accumulating.note_ended());
        assert!(!accumulating.note_ended());
    }

    #[test]
    fn triggered_is_terminal() {
        let mut session = WatchSession::new();
        feed_forward(&mut session, 61, None);
        assert_eq!(session.phase(), WatchPhase::Triggered);

        assert!(!session.observe_position(200.0, Some(120.0)));
        assert!(!session.note_ended());
    }
}
