//! These modules are shared among the player, the scheduler and the session manager.
use std::time::{SystemTime, UNIX_EPOCH};

pub mod box_error;
pub mod config;
pub mod dj_error;
pub mod messages;
pub mod stream_time_stat;

/// microseconds since the epoch.  All scheduler timestamps use this clock.
pub fn get_micro_time() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or(0)
}
