//! codec boundary: turns one interval of PCM into transmission blocks
use byteorder::{ByteOrder, NetworkEndian};
use simple_error::bail;

use crate::common::box_error::BoxError;

pub trait IntervalEncoder: Send + Sync {
    /// encode deinterleaved channels into one or more ordered blocks
    fn encode_interval(&self, sample_rate: u32, channels: &[Vec<f32>]) -> Result<Vec<Vec<u8>>, BoxError>;
}

/// Uncompressed encoder.  Samples are interleaved, clipped to i16 and
/// written network endian, then cut into blocks of at most `block_size` bytes.
pub struct PcmBlockEncoder {
    block_size: usize,
}

impl PcmBlockEncoder {
    pub fn new(block_size: usize) -> PcmBlockEncoder {
        // keep whole i16 samples inside a block
        let block_size = (block_size.max(2) / 2) * 2;
        PcmBlockEncoder { block_size }
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

impl IntervalEncoder for PcmBlockEncoder {
    fn encode_interval(&self, _sample_rate: u32, channels: &[Vec<f32>]) -> Result<Vec<Vec<u8>>, BoxError> {
        if channels.is_empty() {
            bail!("no channels to encode");
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            bail!("channel lengths differ");
        }
        let mut bytes = vec![0u8; frames * channels.len() * 2];
        let mut offset = 0;
        for frame in 0..frames {
            for chan in channels {
                NetworkEndian::write_i16(&mut bytes[offset..offset + 2], to_i16(chan[frame]));
                offset += 2;
            }
        }
        if bytes.is_empty() {
            return Ok(vec![vec![]]);
        }
        Ok(bytes.chunks(self.block_size).map(|c| c.to_vec()).collect())
    }
}

#[cfg(test)]
mod test_interval_encoder {
    use super::*;

    #[test]
    fn interleaves_network_endian() {
        let enc = PcmBlockEncoder::new(1024);
        let blocks = enc.encode_interval(48_000, &[vec![1.0, 0.0], vec![-1.0, 0.5]]).unwrap();
        assert_eq!(blocks.len(), 1);
        let b = &blocks[0];
        assert_eq!(b.len(), 8);
        assert_eq!(NetworkEndian::read_i16(&b[0..2]), i16::MAX);
        assert_eq!(NetworkEndian::read_i16(&b[2..4]), -i16::MAX);
        assert_eq!(NetworkEndian::read_i16(&b[4..6]), 0);
        assert_eq!(NetworkEndian::read_i16(&b[6..8]), 16383);
    }

    #[test]
    fn splits_into_blocks() {
        // rounded down to 6 so a block never splits a sample
        let enc = PcmBlockEncoder::new(7);
        // 5 frames * 2 channels * 2 bytes = 20 bytes -> 6 + 6 + 6 + 2
        let blocks = enc.encode_interval(48_000, &[vec![0.1; 5], vec![0.1; 5]]).unwrap();
        let sizes: Vec<usize> = blocks.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![6, 6, 6, 2]);
    }

    #[test]
    fn empty_interval_is_one_empty_block() {
        let enc = PcmBlockEncoder::new(1024);
        let blocks = enc.encode_interval(48_000, &[vec![], vec![]]).unwrap();
        assert_eq!(blocks, vec![Vec::<u8>::new()]);
    }

    #[test]
    fn ragged_channels_fail() {
        let enc = PcmBlockEncoder::new(1024);
        assert!(enc.encode_interval(48_000, &[vec![0.0; 3], vec![0.0; 2]]).is_err());
        assert!(enc.encode_interval(48_000, &[]).is_err());
    }
}
