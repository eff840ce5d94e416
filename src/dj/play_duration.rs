//! how long each participant keeps the floor during a track
use std::time::Duration;

/// Splits a track into `turns` equal turns and clamps each to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayDurationPolicy {
    turns: u32,
    min: Duration,
    max: Duration,
}

impl PlayDurationPolicy {
    pub fn new(turns: u32, min: Duration, max: Duration) -> PlayDurationPolicy {
        PlayDurationPolicy {
            turns: turns.max(1),
            min: min.min(max),
            max,
        }
    }

    pub fn play_duration(&self, track_duration: Duration) -> Duration {
        (track_duration / self.turns).clamp(self.min, self.max)
    }
}

impl Default for PlayDurationPolicy {
    fn default() -> Self {
        PlayDurationPolicy::new(4, Duration::from_secs(60), Duration::from_secs(180))
    }
}

#[cfg(test)]
mod test_play_duration {
    use super::*;

    #[test]
    fn splits_and_clamps() {
        let policy = PlayDurationPolicy::default();
        assert_eq!(policy.play_duration(Duration::from_secs(480)), Duration::from_secs(120));
        assert_eq!(policy.play_duration(Duration::from_secs(100)), Duration::from_secs(60));
        assert_eq!(policy.play_duration(Duration::from_secs(3600)), Duration::from_secs(180));
    }

    #[test]
    fn zero_turns_is_one_turn() {
        let policy = PlayDurationPolicy::new(0, Duration::ZERO, Duration::from_secs(1000));
        assert_eq!(policy.play_duration(Duration::from_secs(300)), Duration::from_secs(300));
    }

    #[test]
    fn inverted_bounds() {
        let policy = PlayDurationPolicy::new(1, Duration::from_secs(90), Duration::from_secs(30));
        assert_eq!(policy.play_duration(Duration::from_secs(10)), Duration::from_secs(30));
    }
}
