use derive_more::{Display, From, Into};

#[derive(Copy, Clone, Debug, Default, Display, From, Into, Eq, Ord, PartialOrd, PartialEq)]
pub struct SectorID(u64);

impl SectorID {
    pub(crate) const BOOT: Self = Self(0);
}

/// Cluster number as stored in the FAT and directory entries.
///
/// Data clusters start at 2; anything else read out of a chain is either an
/// end/bad marker or corruption, which the owner of the chain decides.
#[derive(Copy, Clone, Debug, Default, Display, From, Into, Eq, Ord, PartialOrd, PartialEq)]
pub struct ClusterID(u32);

impl ClusterID {
    pub const FIRST: Self = Self(2);

    /// Index into the cluster heap, only meaningful for data clusters
    pub(crate) fn heap_index(self) -> u32 {
        self.0 - Self::FIRST.0
    }
}

impl<I: Into<u32>> core::ops::Add<I> for ClusterID {
    type Output = Self;

    fn add(self, rhs: I) -> Self {
        Self(self.0.wrapping_add(rhs.into()))
    }
}
