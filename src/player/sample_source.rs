//! decoder boundary: where the player pulls PCM from
//!
//! Sources always hand back two deinterleaved channels.  Mono files are
//! duplicated onto both.
use std::{
    fs::File,
    io::BufReader,
    path::Path,
};

#[cfg(test)]
use mockall::automock;

use hound::{SampleFormat, WavReader};
use simple_error::bail;

use crate::common::box_error::BoxError;

pub const CHANNELS: usize = 2;

pub type StereoFrames = [Vec<f32>; CHANNELS];

pub trait SampleSource: Send {
    fn sample_rate(&self) -> u32;
    /// read up to `frames` frames.  `Ok(None)` once the source is exhausted.
    fn read_frames(&mut self, frames: usize) -> Result<Option<StereoFrames>, BoxError>;
}

/// opens a decoder for a track file
#[cfg_attr(test, automock)]
pub trait SourceLoader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn SampleSource>, BoxError>;
}

/// reads wav files with hound
pub struct WavLoader;

impl SourceLoader for WavLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn SampleSource>, BoxError> {
        Ok(Box::new(WavSource::open(path)?))
    }
}

pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    channels: usize,
    sample_rate: u32,
    format: SampleFormat,
    scale: f32,
}

impl WavSource {
    pub fn open(path: &Path) -> Result<WavSource, BoxError> {
        let reader = WavReader::open(path)?;
        let spec = reader.spec();
        if spec.channels == 0 || spec.channels > 2 {
            bail!("{}: {} channel audio is not supported", path.display(), spec.channels);
        }
        Ok(WavSource {
            channels: spec.channels as usize,
            sample_rate: spec.sample_rate,
            format: spec.sample_format,
            scale: (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32,
            reader,
        })
    }

    fn next_sample(&mut self) -> Option<Result<f32, hound::Error>> {
        match self.format {
            SampleFormat::Float => self.reader.samples::<f32>().next(),
            SampleFormat::Int => {
                let scale = self.scale;
                self.reader
                    .samples::<i32>()
                    .next()
                    .map(|s| s.map(|v| v as f32 / scale))
            }
        }
    }
}

impl SampleSource for WavSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_frames(&mut self, frames: usize) -> Result<Option<StereoFrames>, BoxError> {
        let mut out: StereoFrames = [Vec::with_capacity(frames), Vec::with_capacity(frames)];
        'frames: for _ in 0..frames {
            for chan in 0..self.channels {
                match self.next_sample() {
                    Some(sample) => out[chan].push(sample?),
                    None => break 'frames,
                }
            }
            if self.channels == 1 {
                let s = out[0][out[0].len() - 1];
                out[1].push(s);
            }
        }
        // drop a half read frame at the very end of a truncated file
        let len = out[0].len().min(out[1].len());
        out[0].truncate(len);
        out[1].truncate(len);
        if len == 0 {
            return Ok(None);
        }
        Ok(Some(out))
    }
}

/// samples already in memory.  Handy for generated audio.
pub struct MemorySource {
    sample_rate: u32,
    channels: StereoFrames,
    position: usize,
}

impl MemorySource {
    pub fn new(sample_rate: u32, left: Vec<f32>, right: Vec<f32>) -> MemorySource {
        MemorySource {
            sample_rate,
            channels: [left, right],
            position: 0,
        }
    }
}

impl SampleSource for MemorySource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_frames(&mut self, frames: usize) -> Result<Option<StereoFrames>, BoxError> {
        let len = self.channels[0].len().min(self.channels[1].len());
        if self.position >= len {
            return Ok(None);
        }
        let end = (self.position + frames).min(len);
        let chunk = [
            self.channels[0][self.position..end].to_vec(),
            self.channels[1][self.position..end].to_vec(),
        ];
        self.position = end;
        Ok(Some(chunk))
    }
}
