//! Per-dependency hysteretic health tracking (spec §4.8: "enter on 3
//! consecutive failures, exit on 2 consecutive successes"). Shape
//! generalizes `bravo1goingdark-ucfp`'s `CircuitBreaker` counters
//! (`consecutive_failures`/state) from a binary open/closed circuit to a
//! plain healthy/unhealthy flag — there is no half-open probe here because
//! health is driven by an external periodic prober, not by request traffic.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

const ENTER_UNHEALTHY_THRESHOLD: u32 = 3;
const EXIT_UNHEALTHY_THRESHOLD: u32 = 2;

pub struct DependencyHealth {
    healthy: AtomicBool,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
}

impl Default for DependencyHealth {
    fn default() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
        }
    }
}

impl DependencyHealth {
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Records a probe outcome. Returns `true` if the health flag flipped.
    pub fn record(&self, ok: bool) -> bool {
        if ok {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
            if !self.healthy.load(Ordering::Relaxed) && successes >= EXIT_UNHEALTHY_THRESHOLD {
                self.healthy.store(true, Ordering::Relaxed);
                return true;
            }
        } else {
            self.consecutive_successes.store(0, Ordering::Relaxed);
            let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
            if self.healthy.load(Ordering::Relaxed) && failures >= ENTER_UNHEALTHY_THRESHOLD {
                self.healthy.store(false, Ordering::Relaxed);
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_healthy() {
        let health = DependencyHealth::default();
        assert!(health.is_healthy());
    }

    #[test]
    fn two_failures_do_not_flip_it() {
        let health = DependencyHealth::default();
        assert!(!health.record(false));
        assert!(!health.record(false));
        assert!(health.is_healthy());
    }

    #[test]
    fn three_consecutive_failures_flip_it_unhealthy() {
        let health = DependencyHealth::default();
        health.record(false);
        health.record(false);
        assert!(health.record(false));
        assert!(!health.is_healthy());
    }

    #[test]
    fn a_success_in_between_resets_the_failure_streak() {
        let health = DependencyHealth::default();
        health.record(false);
        health.record(false);
        health.record(true);
        assert!(!health.record(false));
        assert!(!health.record(false));
        assert!(health.is_healthy(), "streak must restart after the intervening success");
    }

    #[test]
    fn two_consecutive_successes_recover_it() {
        let health = DependencyHealth::default();
        health.record(false);
        health.record(false);
        health.record(false);
        assert!(!health.is_healthy());

        assert!(!health.record(true));
        assert!(health.record(true));
        assert!(health.is_healthy());
    }

    #[test]
    fn one_success_is_not_enough_to_recover() {
        let health = DependencyHealth::default();
        health.record(false);
        health.record(false);
        health.record(false);
        health.record(true);
        assert!(!health.is_healthy());
    }
}
