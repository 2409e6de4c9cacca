//! Wall-clock sampling for the fixed-cadence step timer.

use std::sync::Weak;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, trace};

use super::BridgeShared;

/// Elapsed-time sampler. The first sample only records a baseline.
#[derive(Debug, Default)]
pub(crate) struct StepClock {
    last: Option<Instant>,
}

impl StepClock {
    /// Seconds since the previous sample, or `None` for the baseline sample.
    pub fn sample(&mut self, now: Instant) -> Option<f64> {
        let dt = self
            .last
            .map(|last| now.saturating_duration_since(last).as_secs_f64());
        self.last = Some(now);
        dt
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// Real seconds the step covered.
    pub dt: f64,
    /// Internal fixed steps the world took.
    pub sub_steps: u32,
    /// Property assignments written back to the graph.
    pub written: usize,
    /// Write-backs rejected by an observer.
    pub failures: usize,
}

/// Timer body: tick every `period` until stopped, the bridge is gone, or
/// the world faults.
pub(crate) async fn run(shared: Weak<BridgeShared>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let Some(shared) = shared.upgrade() else {
            trace!("bridge dropped, step loop exiting");
            break;
        };
        if let Err(e) = shared.tick_at(Instant::now()) {
            error!(error = %e, "simulation fault, step loop stopped");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_is_baseline() {
        let mut clock = StepClock::default();
        let t0 = Instant::now();
        assert_eq!(clock.sample(t0), None);
        let dt = clock.sample(t0 + Duration::from_millis(20)).unwrap();
        assert!((dt - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_reset_restores_baseline() {
        let mut clock = StepClock::default();
        let t0 = Instant::now();
        clock.sample(t0);
        clock.reset();
        assert_eq!(clock.sample(t0 + Duration::from_secs(5)), None);
    }
}
