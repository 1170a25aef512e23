use std::time::Duration;

use log::{debug, error, info, warn};

use crate::models::session::{SessionId, SessionPhase, VotingSession};
use crate::store::{anchor_key, KvStore};

/// Wall-clock source, in milliseconds since the Unix epoch.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Idle,
    Ticking {
        session_id: SessionId,
        anchor: i64,
        remaining_ms: u64,
    },
    Expired {
        session_id: SessionId,
    },
}

/// Vote window anchored to a persisted start time, so a restart resumes the
/// countdown instead of granting a fresh one.
#[derive(Debug)]
pub struct CountdownTimer {
    duration_ms: u64,
    state: CountdownState,
}

impl CountdownTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            state: CountdownState::Idle,
        }
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    /// Follows the session after every poll: arms on entering `Voting`, falls
    /// back to idle on any other phase.
    pub fn observe(
        &mut self,
        session: Option<&VotingSession>,
        store: &mut impl KvStore,
        now: i64,
    ) {
        let Some(session) = session.filter(|s| s.phase == SessionPhase::Voting) else {
            if self.state != CountdownState::Idle {
                debug!("Countdown idle");
            }
            self.state = CountdownState::Idle;
            return;
        };

        match self.state {
            CountdownState::Ticking { session_id, .. } | CountdownState::Expired { session_id }
                if session_id == session.session_id => {}
            _ => self.arm(session.session_id, store, now),
        }
    }

    fn arm(&mut self, session_id: SessionId, store: &mut impl KvStore, now: i64) {
        let key = anchor_key(session_id);
        let stored = store.get(&key).and_then(|raw| match raw.parse::<i64>() {
            Ok(anchor) => Some(anchor),
            Err(e) => {
                warn!("Unreadable countdown anchor {:?} for session {}: {}", raw, session_id, e);
                None
            }
        });

        let anchor = match stored {
            Some(anchor) => {
                debug!("Resuming countdown for session {} from {}", session_id, anchor);
                anchor
            }
            None => {
                if let Err(e) = store.set(&key, &now.to_string()) {
                    error!("Failed to persist countdown anchor for session {}: {}", session_id, e);
                }
                info!("Vote window opened for session {}", session_id);
                now
            }
        };

        self.state = CountdownState::Ticking {
            session_id,
            anchor,
            remaining_ms: self.duration_ms,
        };
        self.tick(now);
    }

    /// Recomputes the remaining time. Never increases for a fixed anchor, even
    /// if the wall clock steps backwards.
    pub fn tick(&mut self, now: i64) -> Option<u64> {
        if let CountdownState::Ticking {
            session_id,
            anchor,
            remaining_ms,
        } = self.state
        {
            let elapsed = u64::try_from(now.saturating_sub(anchor)).unwrap_or(0);
            let remaining = self.duration_ms.saturating_sub(elapsed).min(remaining_ms);
            self.state = if remaining == 0 {
                info!("Vote window closed for session {}", session_id);
                CountdownState::Expired { session_id }
            } else {
                CountdownState::Ticking {
                    session_id,
                    anchor,
                    remaining_ms: remaining,
                }
            };
        }
        self.remaining_ms()
    }

    pub fn remaining_ms(&self) -> Option<u64> {
        match self.state {
            CountdownState::Idle => None,
            CountdownState::Ticking { remaining_ms, .. } => Some(remaining_ms),
            CountdownState::Expired { .. } => Some(0),
        }
    }

    /// Whole seconds, rounded up so the display reads the full window at start.
    pub fn remaining_secs(&self) -> Option<u64> {
        self.remaining_ms().map(|ms| ms.div_ceil(1000))
    }

    pub fn window_open(&self, session_id: SessionId) -> bool {
        matches!(
            self.state,
            CountdownState::Ticking { session_id: armed, remaining_ms, .. }
                if armed == session_id && remaining_ms > 0
        )
    }

    pub fn reset(&mut self) {
        self.state = CountdownState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const T0: i64 = 1_700_000_000_000;

    fn session(id: i64, phase: SessionPhase) -> VotingSession {
        VotingSession {
            session_id: SessionId(id),
            title: format!("Topic{id}"),
            phase,
            text: String::new(),
            image_ref: None,
            questions: Vec::new(),
        }
    }

    fn timer() -> CountdownTimer {
        CountdownTimer::new(Duration::from_secs(30))
    }

    #[test]
    fn idle_until_voting() {
        let mut store = MemoryStore::new();
        let mut timer = timer();

        timer.observe(Some(&session(1, SessionPhase::Presenting)), &mut store, T0);
        assert_eq!(timer.state(), CountdownState::Idle);
        assert_eq!(timer.remaining_ms(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn arming_persists_anchor_once() {
        let mut store = MemoryStore::new();
        let mut timer = timer();
        let voting = session(1, SessionPhase::Voting);

        timer.observe(Some(&voting), &mut store, T0);
        assert_eq!(store.get("anchor/1"), Some(T0.to_string()));
        assert_eq!(timer.remaining_secs(), Some(30));
        assert!(timer.window_open(SessionId(1)));

        timer.reset();
        timer.observe(Some(&voting), &mut store, T0 + 5_000);
        assert_eq!(store.get("anchor/1"), Some(T0.to_string()));
        assert_eq!(timer.remaining_ms(), Some(25_000));
    }

    #[test]
    fn reload_resumes_from_anchor() {
        let mut store = MemoryStore::new();
        store.set("anchor/1", &T0.to_string()).unwrap();

        let mut reloaded = timer();
        reloaded.observe(Some(&session(1, SessionPhase::Voting)), &mut store, T0 + 12_500);
        assert_eq!(reloaded.remaining_ms(), Some(17_500));
        assert_eq!(reloaded.remaining_secs(), Some(18));
    }

    #[test]
    fn remaining_is_monotonic_and_hits_zero_once() {
        let mut store = MemoryStore::new();
        let mut timer = timer();
        timer.observe(Some(&session(1, SessionPhase::Voting)), &mut store, T0);

        let mut last = u64::MAX;
        let mut zeros = 0;
        for step in 0..40 {
            let remaining = timer.tick(T0 + step * 1_000).unwrap();
            assert!(remaining <= last);
            if remaining == 0 && last != 0 {
                zeros += 1;
            }
            last = remaining;
        }
        assert_eq!(zeros, 1);
        assert_eq!(timer.state(), CountdownState::Expired { session_id: SessionId(1) });
        assert!(!timer.window_open(SessionId(1)));
    }

    #[test]
    fn clock_stepping_back_does_not_extend_window() {
        let mut store = MemoryStore::new();
        let mut timer = timer();
        timer.observe(Some(&session(1, SessionPhase::Voting)), &mut store, T0);

        assert_eq!(timer.tick(T0 + 20_000), Some(10_000));
        assert_eq!(timer.tick(T0 + 2_000), Some(10_000));
    }

    #[test]
    fn expired_window_stays_closed_for_the_same_session() {
        let mut store = MemoryStore::new();
        let mut timer = timer();
        let voting = session(1, SessionPhase::Voting);
        timer.observe(Some(&voting), &mut store, T0);
        timer.tick(T0 + 31_000);

        timer.observe(Some(&voting), &mut store, T0 + 32_000);
        assert_eq!(timer.state(), CountdownState::Expired { session_id: SessionId(1) });
        assert_eq!(timer.tick(T0 + 33_000), Some(0));
    }

    #[test]
    fn new_session_gets_new_anchor() {
        let mut store = MemoryStore::new();
        let mut timer = timer();
        timer.observe(Some(&session(1, SessionPhase::Voting)), &mut store, T0);
        timer.tick(T0 + 31_000);

        timer.observe(Some(&session(2, SessionPhase::Voting)), &mut store, T0 + 40_000);
        assert!(timer.window_open(SessionId(2)));
        assert_eq!(timer.remaining_ms(), Some(30_000));
        assert_eq!(store.get("anchor/2"), Some((T0 + 40_000).to_string()));
    }

    #[test]
    fn closing_phase_returns_to_idle() {
        let mut store = MemoryStore::new();
        let mut timer = timer();
        timer.observe(Some(&session(1, SessionPhase::Voting)), &mut store, T0);

        timer.observe(Some(&session(1, SessionPhase::VotingClosed)), &mut store, T0 + 3_000);
        assert_eq!(timer.state(), CountdownState::Idle);
        assert_eq!(timer.tick(T0 + 4_000), None);
    }

    #[test]
    fn unreadable_anchor_is_replaced() {
        let mut store = MemoryStore::new();
        store.set("anchor/1", "yesterday").unwrap();
        let mut timer = timer();

        timer.observe(Some(&session(1, SessionPhase::Voting)), &mut store, T0);
        assert_eq!(store.get("anchor/1"), Some(T0.to_string()));
        assert_eq!(timer.remaining_ms(), Some(30_000));
    }
}
