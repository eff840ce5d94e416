//! Interval sink that writes everything the player transmits to a file.
//!
//! Stands in for the network client when running the bot on its own.  Each
//! record is a one byte tag and the 16 byte interval guid followed by
//!
//! * begin: channel index (u8)
//! * write: flags (u8), block length (u32, network order), block bytes
use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Read, Write},
    sync::Mutex,
};

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use log::trace;
use simple_error::bail;

use crate::common::box_error::BoxError;

use super::interval::{IntervalGuid, IntervalWriter};

const RECORD_BEGIN: u8 = 1;
const RECORD_WRITE: u8 = 2;

pub struct IntervalDumpWriter {
    filename: String,
    file: Mutex<BufWriter<File>>,
}

impl IntervalDumpWriter {
    pub fn new(filename: &str) -> Result<IntervalDumpWriter, BoxError> {
        Ok(IntervalDumpWriter {
            filename: filename.to_string(),
            file: Mutex::new(BufWriter::new(File::create(filename)?)),
        })
    }

    pub fn get_filename(&self) -> &str {
        &self.filename
    }

    fn record(&self, tag: u8, guid: &IntervalGuid, body: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>) -> Result<(), BoxError> {
        let mut file = match self.file.lock() {
            Ok(f) => f,
            Err(_) => bail!("dump file {} lock poisoned", self.filename),
        };
        file.write_u8(tag)?;
        file.write_all(guid)?;
        body(&mut *file)?;
        file.flush()?;
        Ok(())
    }
}

impl IntervalWriter for IntervalDumpWriter {
    fn interval_begin(&self, guid: IntervalGuid, channel_index: u8) -> Result<(), BoxError> {
        trace!("dump begin {:02x?}", &guid[..4]);
        self.record(RECORD_BEGIN, &guid, |f| f.write_u8(channel_index))
    }

    fn interval_write(&self, guid: IntervalGuid, data: &[u8], flags: u8) -> Result<(), BoxError> {
        self.record(RECORD_WRITE, &guid, |f| {
            f.write_u8(flags)?;
            f.write_u32::<NetworkEndian>(data.len() as u32)?;
            f.write_all(data)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DumpRecord {
    Begin { guid: IntervalGuid, channel_index: u8 },
    Block { guid: IntervalGuid, flags: u8, data: Vec<u8> },
}

/// reads a dump back one record at a time
pub struct IntervalDumpReader<R: Read> {
    reader: R,
}

impl IntervalDumpReader<BufReader<File>> {
    pub fn open(filename: &str) -> Result<Self, BoxError> {
        Ok(IntervalDumpReader {
            reader: BufReader::new(File::open(filename)?),
        })
    }
}

impl<R: Read> IntervalDumpReader<R> {
    pub fn new(reader: R) -> IntervalDumpReader<R> {
        IntervalDumpReader { reader }
    }

    /// `Ok(None)` at a clean end of file
    pub fn read_record(&mut self) -> Result<Option<DumpRecord>, BoxError> {
        let tag = match self.reader.read_u8() {
            Ok(tag) => tag,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut guid: IntervalGuid = [0; 16];
        self.reader.read_exact(&mut guid)?;
        match tag {
            RECORD_BEGIN => Ok(Some(DumpRecord::Begin {
                guid,
                channel_index: self.reader.read_u8()?,
            })),
            RECORD_WRITE => {
                let flags = self.reader.read_u8()?;
                let len = self.reader.read_u32::<NetworkEndian>()? as usize;
                let mut data = vec![0; len];
                self.reader.read_exact(&mut data)?;
                Ok(Some(DumpRecord::Block { guid, flags, data }))
            }
            _ => bail!("unknown dump record tag {}", tag),
        }
    }
}

#[cfg(test)]
mod test_interval_dump {
    use super::*;
    use crate::player::interval::{AudioInterval, INTERVAL_FLAG_FINAL};

    #[test]
    fn dump_and_read_back() {
        let path = std::env::temp_dir().join("jam_dj_bot_dump_test.dmp");
        let filename = path.to_str().unwrap();
        let writer = IntervalDumpWriter::new(filename).unwrap();
        assert_eq!(writer.get_filename(), filename);
        let mut interval = AudioInterval::new([9; 16], 1, vec![vec![1, 2, 3], vec![4]]);
        interval.transmit(&writer).unwrap();

        let mut reader = IntervalDumpReader::open(filename).unwrap();
        assert_eq!(
            reader.read_record().unwrap(),
            Some(DumpRecord::Begin { guid: [9; 16], channel_index: 1 })
        );
        assert_eq!(
            reader.read_record().unwrap(),
            Some(DumpRecord::Block { guid: [9; 16], flags: 0, data: vec![1, 2, 3] })
        );
        assert_eq!(
            reader.read_record().unwrap(),
            Some(DumpRecord::Block { guid: [9; 16], flags: INTERVAL_FLAG_FINAL, data: vec![4] })
        );
        assert_eq!(reader.read_record().unwrap(), None);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn bad_tag() {
        let mut bytes = vec![7u8];
        bytes.extend_from_slice(&[0; 16]);
        let mut reader = IntervalDumpReader::new(&bytes[..]);
        assert!(reader.read_record().is_err());
    }

    #[test]
    fn truncated_block() {
        let mut bytes = vec![RECORD_WRITE];
        bytes.extend_from_slice(&[0; 16]);
        bytes.extend_from_slice(&[0, 0, 0, 0, 9, 1]);
        let mut reader = IntervalDumpReader::new(&bytes[..]);
        assert!(reader.read_record().is_err());
    }
}
