//! Fold a cluster allocation chain into contiguous disk regions.

use std::io;

use crate::error::{Error, Result};
use crate::location::{Region, RegionList, DISK_UNIT_SIZE, IMAGE_UNIT_SIZE};
use crate::types::ClusterID;

const INITIAL_CAPACITY: usize = 1024;

/// Cluster allocation chain of a single file
pub trait ClusterChain {
    fn cluster_size(&self) -> u32;
    fn first(&mut self) -> Result<ClusterID>;
    fn next(&mut self, cluster_id: ClusterID) -> Result<ClusterID>;
    fn is_valid(&self, cluster_id: ClusterID) -> bool;
    /// Byte offset of a valid cluster from start of the volume
    fn offset(&self, cluster_id: ClusterID) -> u64;
}

/// Append-only region storage, extending the last region when disk-contiguous
pub(crate) struct RegionBuilder {
    regions: Vec<Region>,
    image_units: u64,
}

impl RegionBuilder {
    pub fn new() -> Self {
        Self { regions: Vec::with_capacity(INITIAL_CAPACITY), image_units: 0 }
    }

    /// Flush an extent of `size` bytes starting at byte `offset` of disk
    pub fn push(&mut self, offset: u64, size: u64) {
        if size == 0 {
            return;
        }
        if size % IMAGE_UNIT_SIZE as u64 != 0 {
            trace!("Final extent at {} of {} bytes rounded up", offset, size);
        }
        let count = size.div_ceil(IMAGE_UNIT_SIZE as u64) as u32;
        let disk_start = offset / DISK_UNIT_SIZE as u64;
        let ratio = (IMAGE_UNIT_SIZE / DISK_UNIT_SIZE) as u64;
        if let Some(last) = self.regions.last_mut() {
            if last.disk_start + last.image_count as u64 * ratio == disk_start {
                last.image_count += count;
                self.image_units += count as u64;
                return;
            }
        }
        if self.regions.len() == self.regions.capacity() {
            let capacity = self.regions.capacity();
            self.regions.reserve_exact(capacity.max(1));
            debug!("Region storage grown to {}", self.regions.capacity());
        }
        self.regions.push(Region { image_start: self.image_units as u32, image_count: count, disk_start });
        self.image_units += count as u64;
    }

    pub fn build(self) -> RegionList {
        RegionList::new(self.regions)
    }
}

fn invalid(message: String) -> Error {
    Error::IO(io::Error::new(io::ErrorKind::InvalidData, message))
}

/// Regions of a `length` bytes file, disk offsets shifted by `base` bytes
///
/// Every extent but the last must be a whole number of image units.
pub fn extract<C: ClusterChain>(chain: &mut C, length: u64, base: u64) -> Result<RegionList> {
    let cluster_size = chain.cluster_size() as u64;
    let num_clusters = length.div_ceil(cluster_size);
    let mut builder = RegionBuilder::new();

    let mut cluster_id = chain.first()?;
    if !chain.is_valid(cluster_id) {
        warn!("Invalid first cluster {}", cluster_id);
        return Err(invalid(format!("invalid first cluster {}", cluster_id)));
    }
    if num_clusters == 0 {
        return Ok(builder.build());
    }

    let mut pending: Option<(u64, u64)> = None;
    for index in 0..num_clusters {
        if index > 0 {
            cluster_id = chain.next(cluster_id)?;
        }
        if !chain.is_valid(cluster_id) {
            warn!("Invalid cluster {} at index {} of chain", cluster_id, index);
            return Err(invalid(format!("invalid cluster {} in chain", cluster_id)));
        }
        let offset = base + chain.offset(cluster_id);
        let size = match index + 1 == num_clusters {
            true => length - index * cluster_size,
            false => cluster_size,
        };
        pending = match pending {
            Some((start, pending_size)) if start + pending_size == offset => Some((start, pending_size + size)),
            Some((start, pending_size)) => {
                if pending_size % IMAGE_UNIT_SIZE as u64 != 0 {
                    warn!("Extent at {} of {} bytes not aligned to image unit", start, pending_size);
                    return Err(invalid(format!("extent of {} bytes not aligned to image unit", pending_size)));
                }
                builder.push(start, pending_size);
                Some((offset, size))
            }
            None => Some((offset, size)),
        };
    }
    if let Some((start, size)) = pending {
        builder.push(start, size);
    }
    Ok(builder.build())
}
