use crate::types::{ClusterID, SectorID};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Entry {
    Next(ClusterID),
    BadCluster,
    Last,
}

impl TryFrom<u32> for Entry {
    type Error = u32;
    fn try_from(value: u32) -> Result<Self, u32> {
        match value {
            2..=0xFFFFFFF6 => Ok(Self::Next(value.into())),
            0xFFFFFFF7 => Ok(Self::BadCluster),
            0xFFFFFFFF => Ok(Self::Last),
            _ => Err(value),
        }
    }
}

/// Location of the first FAT, every entry being a little endian u32
#[derive(Copy, Clone, Debug)]
pub(crate) struct Info {
    sector_size_shift: u8,
    offset: u32,
    length: u32,
}

impl Info {
    pub fn new(sector_size_shift: u8, offset: u32, length: u32) -> Self {
        Self { sector_size_shift, offset, length }
    }

    /// Sector holding the entry of specified cluster
    pub fn sector_id(&self, cluster_id: ClusterID) -> Option<SectorID> {
        let index = (u32::from(cluster_id) as u64 * 4) >> self.sector_size_shift;
        if index >= self.length as u64 {
            return None;
        }
        Some(SectorID::from(self.offset as u64 + index))
    }

    /// Byte offset of the entry within its sector
    pub fn offset(&self, cluster_id: ClusterID) -> usize {
        (u32::from(cluster_id) as usize * 4) & ((1 << self.sector_size_shift) - 1)
    }

    pub fn entry(&self, sector: &[u8], cluster_id: ClusterID) -> u32 {
        let offset = self.offset(cluster_id);
        u32::from_le_bytes([sector[offset], sector[offset + 1], sector[offset + 2], sector[offset + 3]])
    }
}
