use std::fs::File;
use std::io::prelude::*;
use std::io::SeekFrom;
use std::path::Path;

use crate::types::SectorID;

const MAX_SECTOR_SIZE: usize = 4096;

/// Block device or image file opened read-only
#[derive(Debug)]
pub struct FileIO {
    file: File,
    sector_size_shift: u8,
    buffer: Box<[u8; MAX_SECTOR_SIZE]>,
}

impl FileIO {
    pub fn open<P: AsRef<Path>>(filepath: P) -> std::io::Result<Self> {
        let file = File::open(filepath)?;
        Ok(Self { file, sector_size_shift: 9, buffer: Box::new([0u8; MAX_SECTOR_SIZE]) })
    }
}

impl super::IO for FileIO {
    type Error = std::io::Error;

    fn set_sector_size_shift(&mut self, shift: u8) -> Result<(), Self::Error> {
        if (1usize << shift) > MAX_SECTOR_SIZE {
            let message = format!("sector size 2^{} not supported", shift);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, message));
        }
        self.sector_size_shift = shift;
        Ok(())
    }

    fn read(&mut self, sector: SectorID) -> Result<&[u8], Self::Error> {
        let sector_size: usize = 1 << self.sector_size_shift;
        let seek = SeekFrom::Start(u64::from(sector) * sector_size as u64);
        self.file.seek(seek)?;
        self.file.read_exact(&mut self.buffer[..sector_size])?;
        Ok(&self.buffer[..sector_size])
    }
}
