#[cfg(test)]
pub(crate) mod memory;
pub mod std;

use core::fmt::Debug;

use crate::types::SectorID;

pub const BLOCK_SIZE: usize = 512;

/// Read-only sector access for the exFAT reader.
pub trait IO {
    type Error: Debug;

    /// Default to 9, which means 512B
    fn set_sector_size_shift(&mut self, shift: u8) -> Result<(), Self::Error>;
    /// Returns exactly one sector
    fn read(&mut self, id: SectorID) -> Result<&[u8], Self::Error>;
}
