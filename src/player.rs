//! the audio streaming engine
//!
//! A track is decoded into a [`sample_buffer::SampleBuffer`] by one thread while
//! a second thread slices it into tempo aligned intervals, encodes them and hands
//! them to an [`interval::IntervalWriter`] once per interval.
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::{common::dj_error::DjError, tracks::track::Track};

pub mod interval;
pub mod interval_dump;
pub mod interval_encoder;
pub mod jam_player;
pub mod loop_cursor;
pub mod sample_buffer;
pub mod sample_source;

/// how a streaming run ended on its own.  Runs ended by `stop()` report nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEnd {
    /// buffer exhausted with no repeats left
    Completed,
    /// decode, encode or transmission fault
    Failed(String),
}

pub type PlaybackEndFn = Arc<dyn Fn(PlaybackEnd) + Send + Sync>;

/// the controls the session manager drives.  [`jam_player::JamPlayer`] is the real one.
#[cfg_attr(test, automock)]
pub trait Player: Send {
    /// bind a track and reset the repeat count to 0
    fn load_track(&mut self, track: &Track) -> Result<(), DjError>;
    /// how many extra times the loop window plays
    fn set_repeats(&mut self, repeats: u32);
    /// returns once the first intervals are buffered
    fn start(&mut self) -> Result<(), DjError>;
    /// best effort, takes effect at the next interval boundary
    fn stop(&mut self);
    fn playing(&self) -> bool;
    fn set_on_end(&mut self, on_end: PlaybackEndFn);
}
