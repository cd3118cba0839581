use std::io::{Error, ErrorKind};

use crate::types::SectorID;

/// Filesystem image held in memory
#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryIO {
    bytes: Vec<u8>,
    sector_size_shift: u8,
}

impl MemoryIO {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, sector_size_shift: 9 }
    }
}

impl super::IO for MemoryIO {
    type Error = Error;

    fn set_sector_size_shift(&mut self, shift: u8) -> Result<(), Error> {
        self.sector_size_shift = shift;
        Ok(())
    }

    fn read(&mut self, sector: SectorID) -> Result<&[u8], Error> {
        let sector_size = 1u64 << self.sector_size_shift;
        let start = u64::from(sector) * sector_size;
        let end = start + sector_size;
        if end > self.bytes.len() as u64 {
            return Err(Error::new(ErrorKind::UnexpectedEof, format!("sector {} out of range", sector)));
        }
        Ok(&self.bytes[start as usize..end as usize])
    }
}
