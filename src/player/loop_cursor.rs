//! interval timing and loop window slicing
//!
//! [`IntervalTiming`] turns a track's tempo and loop points into frame counts.
//! [`LoopCursor`] walks the buffer one interval at a time, jumping back to the
//! loop start while repeats remain.
use std::{ops::Range, time::Duration};

use crate::{common::dj_error::DjError, tracks::track::Track};

use super::sample_source::CHANNELS;

/// frames to decode before streaming may start
pub const PRE_ROLL_INTERVALS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalTiming {
    pub sample_rate: u32,
    pub interval: Duration,
    /// frames per channel in one interval
    pub interval_frames: usize,
    pub loop_start_frame: usize,
    pub loop_end_frame: usize,
}

/// ceil(sample_rate * micros / 1s)
pub fn micros_to_frames(sample_rate: u32, micros: u64) -> usize {
    ((sample_rate as u128 * micros as u128 + 999_999) / 1_000_000) as usize
}

impl IntervalTiming {
    pub fn new(sample_rate: u32, track: &Track) -> Result<IntervalTiming, DjError> {
        if track.bpm == 0 || track.bpi == 0 {
            return Err(DjError::InvalidInput(format!(
                "track {} has no tempo ({} bpm, {} bpi)",
                track.id, track.bpm, track.bpi
            )));
        }
        if sample_rate == 0 {
            return Err(DjError::SourceUnavailable(format!("track {} reports no sample rate", track.id)));
        }
        // ceil(sample_rate * 60 * bpi / bpm) without going through floats
        let numerator = sample_rate as u64 * 60 * track.bpi as u64;
        let interval_frames = ((numerator + track.bpm as u64 - 1) / track.bpm as u64) as usize;
        Ok(IntervalTiming {
            sample_rate,
            interval: track.interval_duration(),
            interval_frames,
            loop_start_frame: micros_to_frames(sample_rate, track.loop_start),
            loop_end_frame: micros_to_frames(sample_rate, track.loop_end),
        })
    }

    /// interleaved sample count of one interval
    pub fn interval_samples(&self) -> usize {
        self.interval_frames * CHANNELS
    }

    pub fn pre_roll_frames(&self) -> usize {
        self.interval_frames * PRE_ROLL_INTERVALS
    }
}

/// what to send for one interval
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalSlice {
    /// buffer ranges to concatenate
    pub segments: Vec<Range<usize>>,
    /// terminal interval, nothing follows it
    pub last: bool,
}

impl IntervalSlice {
    pub fn frames(&self) -> usize {
        self.segments.iter().map(|r| r.len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct LoopCursor {
    position: usize,
    interval_frames: usize,
    loop_start: usize,
    loop_end: usize,
    repeats: u32,
}

impl LoopCursor {
    pub fn new(timing: &IntervalTiming, repeats: u32) -> LoopCursor {
        LoopCursor {
            position: 0,
            interval_frames: timing.interval_frames,
            loop_start: timing.loop_start_frame,
            loop_end: timing.loop_end_frame,
            repeats,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn repeats_left(&self) -> u32 {
        self.repeats
    }

    /// frames needed in the buffer before the next slice can be planned
    pub fn frames_wanted(&self) -> usize {
        self.position + self.interval_frames
    }

    fn can_loop(&self, available: usize) -> bool {
        self.repeats > 0 && self.loop_end > self.loop_start && self.loop_end <= available
    }

    /// Plan the next interval.  `available` frames are buffered and
    /// `complete` says whether more can still arrive.
    pub fn next_slice(&mut self, available: usize, complete: bool) -> IntervalSlice {
        let end = self.position + self.interval_frames;
        if self.position >= self.loop_start
            && self.position <= self.loop_end
            && end >= self.loop_end
            && self.can_loop(available)
        {
            return self.wrap_slice(available, complete);
        }
        let mut last = false;
        let mut slice_end = end;
        if complete && slice_end >= available {
            slice_end = available;
            last = true;
        }
        let start = self.position.min(slice_end);
        self.position = slice_end;
        IntervalSlice {
            segments: vec![start..slice_end],
            last,
        }
    }

    fn wrap_slice(&mut self, available: usize, complete: bool) -> IntervalSlice {
        let mut segments = vec![self.position..self.loop_end];
        let mut remaining = self.position + self.interval_frames - self.loop_end;
        let mut cursor = self.loop_start;
        self.repeats -= 1;
        // a loop window shorter than an interval can wrap more than once
        while remaining > 0 && self.repeats > 0 && cursor + remaining > self.loop_end {
            segments.push(cursor..self.loop_end);
            remaining -= self.loop_end - cursor;
            cursor = self.loop_start;
            self.repeats -= 1;
        }
        let mut end = cursor + remaining;
        let mut last = false;
        if complete && end >= available {
            end = available;
            last = true;
        }
        if end > cursor {
            segments.push(cursor..end);
        }
        self.position = end.max(cursor);
        IntervalSlice { segments, last }
    }
}
