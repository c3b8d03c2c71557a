//! Periodic timeout sweep and status report
//!
//! Satellite counts and accuracy values only stay meaningful while the
//! receiver keeps repeating them. The [`Sweeper`] clears what has gone stale
//! (see [`GnssState::sweep`](crate::state::GnssState::sweep)) and logs a
//! status line now and then.

use log::{debug, info};

use crate::{
    clock::elapsed_ms,
    config::{Staleness, millis},
    state::{SharedState, SweepReport},
};

#[derive(Debug, Clone)]
pub struct Sweeper {
    state: SharedState,
    staleness: Staleness,
    last_sweep_ms: Option<u64>,
    last_status_ms: Option<u64>,
}

impl Sweeper {
    pub fn new(state: SharedState, staleness: Staleness) -> Self {
        Sweeper {
            state,
            staleness,
            last_sweep_ms: None,
            last_status_ms: None,
        }
    }

    /// Sweeps when the sweep interval has passed; returns the sweep result
    pub fn tick(&mut self, now_ms: u64) -> Option<SweepReport> {
        if !due(self.last_sweep_ms, now_ms, millis(self.staleness.sweep_interval)) {
            return None;
        }
        self.last_sweep_ms = Some(now_ms);

        let report = self.state.sweep(now_ms, &self.staleness);
        if !report.is_empty() {
            debug!(
                "stale data cleared: constellations {:?}, accuracy {}",
                report.expired, report.accuracy_reset
            );
        }

        if due(self.last_status_ms, now_ms, millis(self.staleness.status_interval)) {
            self.last_status_ms = Some(now_ms);
            let snapshot = self.state.snapshot();
            info!(
                "GPS: {} sats {}/{} time {}",
                snapshot.fix,
                snapshot.satellites.total_used(),
                snapshot.satellites.total_visible(),
                snapshot
                    .fix
                    .utc_time
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "--:--:--".into())
            );
        }

        Some(report)
    }

    /// Runs the sweep forever at its configured interval
    #[cfg(feature = "tokio")]
    pub async fn run(mut self, clock: crate::clock::MonotonicClock) {
        let mut interval = tokio::time::interval(self.staleness.sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick(clock.now_ms());
        }
    }
}

fn due(last: Option<u64>, now_ms: u64, interval_ms: u64) -> bool {
    match last {
        Some(last) => elapsed_ms(now_ms, last) >= interval_ms,
        None => true,
    }
}
