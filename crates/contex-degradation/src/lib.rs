//! The Degradation Controller (spec §4.8): derives a process-wide
//! `NORMAL -> DEGRADED -> UNAVAILABLE` mode from dependency health,
//! hysteretically (enter on 3 consecutive failures, exit on 2 consecutive
//! successes) to avoid flapping.

pub mod controller;
pub mod health;
pub mod probe;

pub use controller::{DegradationController, DegradationMode, DEFAULT_PROBE_INTERVAL};
pub use health::DependencyHealth;
pub use probe::{spawn_probe_loop, HealthCheck, Probes};
