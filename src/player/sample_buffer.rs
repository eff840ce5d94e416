//! append only stereo buffer shared by the decode thread and the pacing thread
//!
//! The decode thread is the only writer.  It publishes growth through a
//! condvar so the pacing thread can wait for a range to be decoded instead of
//! polling.  Once `finish` or `fail` is called the length never changes again.
use std::ops::Range;
use std::sync::{Condvar, Mutex, MutexGuard};

use super::sample_source::StereoFrames;

#[derive(Default)]
struct BufferState {
    channels: StereoFrames,
    complete: bool,
    failure: Option<String>,
}

#[derive(Default)]
pub struct SampleBuffer {
    state: Mutex<BufferState>,
    grown: Condvar,
}

impl SampleBuffer {
    pub fn new() -> SampleBuffer {
        SampleBuffer::default()
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn append(&self, chunk: StereoFrames) {
        let mut state = self.lock();
        if state.complete {
            return;
        }
        let [left, right] = chunk;
        state.channels[0].extend(left);
        state.channels[1].extend(right);
        self.grown.notify_all();
    }

    /// no more samples will arrive
    pub fn finish(&self) {
        let mut state = self.lock();
        state.complete = true;
        self.grown.notify_all();
    }

    /// decoding broke, nothing more will arrive and readers should give up
    pub fn fail(&self, reason: &str) {
        let mut state = self.lock();
        state.complete = true;
        state.failure = Some(reason.to_string());
        self.grown.notify_all();
    }

    /// frames currently buffered
    pub fn len(&self) -> usize {
        let state = self.lock();
        state.channels[0].len().min(state.channels[1].len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn failure(&self) -> Option<String> {
        self.lock().failure.clone()
    }

    /// block until `frames` are buffered or the buffer is complete.  Returns
    /// the buffered length and whether the buffer is complete.
    pub fn wait_for(&self, frames: usize) -> (usize, bool) {
        let mut state = self.lock();
        loop {
            let len = state.channels[0].len().min(state.channels[1].len());
            if len >= frames || state.complete {
                return (len, state.complete);
            }
            state = self.grown.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// copy the ranges back to back into a fresh pair of channels
    pub fn copy_segments(&self, segments: &[Range<usize>]) -> StereoFrames {
        let state = self.lock();
        let len = state.channels[0].len().min(state.channels[1].len());
        let total: usize = segments.iter().map(|r| r.len()).sum();
        let mut out: StereoFrames = [Vec::with_capacity(total), Vec::with_capacity(total)];
        for seg in segments {
            let start = seg.start.min(len);
            let end = seg.end.min(len);
            for chan in 0..out.len() {
                out[chan].extend_from_slice(&state.channels[chan][start..end]);
            }
        }
        out
    }
}

#[cfg(test)]
mod test_sample_buffer {
    use super::*;
    use std::{sync::Arc, thread, time::Duration};

    #[test]
    fn append_and_copy() {
        let buf = SampleBuffer::new();
        assert!(buf.is_empty());
        buf.append([vec![0.0, 1.0, 2.0], vec![10.0, 11.0, 12.0]]);
        buf.append([vec![3.0], vec![13.0]]);
        assert_eq!(buf.len(), 4);
        let out = buf.copy_segments(&[2..4, 0..1]);
        assert_eq!(out[0], vec![2.0, 3.0, 0.0]);
        assert_eq!(out[1], vec![12.0, 13.0, 10.0]);
        // ranges past the end are clipped
        assert_eq!(buf.copy_segments(&[3..9])[0], vec![3.0]);
    }

    #[test]
    fn finished_buffer_ignores_appends() {
        let buf = SampleBuffer::new();
        buf.finish();
        buf.append([vec![1.0], vec![1.0]]);
        assert_eq!(buf.wait_for(10), (0, true));
    }

    #[test]
    fn wait_wakes_on_growth() {
        let buf = Arc::new(SampleBuffer::new());
        let writer = buf.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.append([vec![0.0; 5], vec![0.0; 5]]);
            thread::sleep(Duration::from_millis(20));
            writer.append([vec![0.0; 5], vec![0.0; 5]]);
        });
        assert_eq!(buf.wait_for(8), (10, false));
        handle.join().unwrap();
    }

    #[test]
    fn failure_completes() {
        let buf = SampleBuffer::new();
        buf.append([vec![0.0; 2], vec![0.0; 2]]);
        buf.fail("bad frame");
        assert_eq!(buf.wait_for(100), (2, true));
        assert_eq!(buf.failure(), Some("bad frame".to_string()));
    }
}
