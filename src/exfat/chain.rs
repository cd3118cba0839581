use crate::error::Result;
use crate::extent::ClusterChain;
use crate::io;
use crate::types::ClusterID;

use super::ExFAT;

/// Cluster chain of a file, either following FAT or a contiguous run
pub struct Chain<'a, IO> {
    exfat: &'a mut ExFAT<IO>,
    first: ClusterID,
    contiguous: bool,
}

impl<'a, IO> Chain<'a, IO> {
    pub(crate) fn new(exfat: &'a mut ExFAT<IO>, first: ClusterID, contiguous: bool) -> Self {
        Self { exfat, first, contiguous }
    }
}

impl<'a, IO: io::IO<Error = std::io::Error>> ClusterChain for Chain<'a, IO> {
    fn cluster_size(&self) -> u32 {
        self.exfat.cluster_size()
    }

    fn first(&mut self) -> Result<ClusterID> {
        Ok(self.first)
    }

    fn next(&mut self, cluster_id: ClusterID) -> Result<ClusterID> {
        if self.contiguous {
            return Ok(cluster_id + 1u32);
        }
        Ok(ClusterID::from(self.exfat.fat_entry(cluster_id)?))
    }

    fn is_valid(&self, cluster_id: ClusterID) -> bool {
        self.exfat.is_valid(cluster_id)
    }

    fn offset(&self, cluster_id: ClusterID) -> u64 {
        self.exfat.cluster_offset(cluster_id)
    }
}
