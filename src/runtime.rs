use log::{info, warn};
use tokio::time::{Duration, Instant};

use crate::pvt::PvtFlags;

/// Search activity indicator
pub const UPDATE_INDICATOR: [char; 4] = ['\\', '|', '/', '-'];

/// Search state, derived from the stream of samples
#[derive(Debug)]
pub struct Runtime {
    /// Instant the receiver was started
    deploy_time: Instant,

    /// Arrival of the latest valid sample (or deployment)
    last_fix: Instant,

    /// Search indicator position
    cnt: u8,

    /// Receiver flags of the latest sample
    conditions: PvtFlags,

    /// Current fix flag
    pub has_fix: bool,
}

impl Runtime {
    /// Creates a new [Runtime], `baseline` being the instant tracking started
    pub fn new(baseline: Instant) -> Self {
        Self {
            deploy_time: baseline,
            last_fix: baseline,
            cnt: 0,
            conditions: PvtFlags::default(),
            has_fix: false,
        }
    }

    /// Latch a valid sample that arrived at `received`
    pub fn latch_fix(&mut self, received: Instant) {
        if !self.has_fix {
            info!(
                "Fix acquired after {} s",
                received.saturating_duration_since(self.last_fix).as_secs()
            );
        }

        self.has_fix = true;
        self.last_fix = received;
    }

    /// Latch an invalid sample
    pub fn latch_search(&mut self) {
        if self.has_fix {
            warn!("Fix lost");
        }

        self.has_fix = false;
    }

    /// Latch the receiver flags of a new sample, warning about
    /// blocking conditions as they appear. Returns true when one did.
    pub fn latch_conditions(&mut self, flags: PvtFlags) -> bool {
        let mut raised = false;

        for (condition, description) in [
            (PvtFlags::DEADLINE_MISSED, "GNSS operation blocked by LTE"),
            (PvtFlags::NOT_ENOUGH_WINDOW_TIME, "Insufficient GNSS time windows"),
        ] {
            if flags.intersects(condition) && !self.conditions.intersects(condition) {
                warn!("{}", description);
                raised = true;
            }
        }

        self.conditions = flags;
        raised
    }

    /// Arrival of the latest valid sample
    #[cfg(test)]
    pub fn last_fix(&self) -> Instant {
        self.last_fix
    }

    /// Elapsed time since latest valid sample
    pub fn time_since_fix(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_fix)
    }

    /// Advances and returns the search indicator
    pub fn next_indicator(&mut self) -> char {
        self.cnt = self.cnt.wrapping_add(1);
        UPDATE_INDICATOR[(self.cnt % 4) as usize]
    }

    /// Time since deployment
    pub fn uptime(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.deploy_time)
    }
}
