use anyhow::Result;
use log::{info, warn};

use crate::models::phase::AppPhase;

/// Tracks the event-wide phase. Starts live; a failed poll keeps the last value.
#[derive(Debug, Default)]
pub struct PhasePoller {
    phase: AppPhase,
    in_flight: bool,
}

impl PhasePoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> AppPhase {
        self.phase
    }

    pub fn begin(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Returns true when the phase changed.
    pub fn apply(&mut self, result: Result<AppPhase>) -> bool {
        self.in_flight = false;
        match result {
            Ok(phase) if phase != self.phase => {
                info!("Event phase {:?} -> {:?}", self.phase, phase);
                self.phase = phase;
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!("Phase poll failed, staying {:?}: {:#}", self.phase, e);
                false
            }
        }
    }
}
