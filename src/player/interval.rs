//! one interval of encoded audio and the sink that carries it to the jam server
use std::fmt;

#[cfg(test)]
use mockall::automock;

use crate::common::box_error::BoxError;

pub type IntervalGuid = [u8; 16];

/// set on the last block of an interval
pub const INTERVAL_FLAG_FINAL: u8 = 1;

/// The protocol layer that reaches the jam server.  The player calls
/// `interval_begin` once and then `interval_write` for every block in order.
#[cfg_attr(test, automock)]
pub trait IntervalWriter: Send + Sync {
    fn interval_begin(&self, guid: IntervalGuid, channel_index: u8) -> Result<(), BoxError>;
    fn interval_write(&self, guid: IntervalGuid, data: &[u8], flags: u8) -> Result<(), BoxError>;
}

/// encoded blocks for one interval plus a cursor into them
pub struct AudioInterval {
    pub guid: IntervalGuid,
    pub channel_index: u8,
    pub flags: u8,
    data: Vec<Vec<u8>>,
    index: usize,
}

impl AudioInterval {
    pub fn new(guid: IntervalGuid, channel_index: u8, data: Vec<Vec<u8>>) -> AudioInterval {
        AudioInterval {
            guid,
            channel_index,
            flags: 0,
            data,
            index: 0,
        }
    }

    /// a fresh random identifier, unique within the session
    pub fn new_guid() -> IntervalGuid {
        rand::random()
    }

    /// next block and whether more follow it
    pub fn next_block(&mut self) -> Option<(&[u8], bool)> {
        let block = self.data.get(self.index)?;
        self.index += 1;
        Some((block.as_slice(), self.index < self.data.len()))
    }

    /// announce the interval then send every block, flagging the last one
    pub fn transmit(&mut self, writer: &dyn IntervalWriter) -> Result<(), BoxError> {
        let guid = self.guid;
        writer.interval_begin(guid, self.channel_index)?;
        if self.data.is_empty() {
            self.flags = INTERVAL_FLAG_FINAL;
            return writer.interval_write(guid, &[], self.flags);
        }
        while let Some((block, has_next)) = self.next_block() {
            let flags = if has_next { 0 } else { INTERVAL_FLAG_FINAL };
            writer.interval_write(guid, block, flags)?;
        }
        self.flags = INTERVAL_FLAG_FINAL;
        Ok(())
    }
}

impl fmt::Display for AudioInterval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{ guid: {:02x?}, channel: {}, blocks: {}, sent: {} }}",
            &self.guid[..4],
            self.channel_index,
            self.data.len(),
            self.index
        )
    }
}
