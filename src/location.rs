//! Image location: the disk regions backing the boot image file.
//!
//! Wire format, little endian: identity GUID, image unit size, disk unit size,
//! region count, then `region count` entries of 16 bytes each.

use core::fmt::{Display, Formatter};
use core::mem;

use crate::endian::Little as LE;
use crate::error::{Error, Result};
use crate::record::IDENTITY;

/// Image is addressed in 2048 byte units
pub const IMAGE_UNIT_SIZE: u32 = 2048;
/// Disk is addressed in 512 byte units
pub const DISK_UNIT_SIZE: u32 = 512;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Region {
    pub image_start: u32, // unit image
    pub image_count: u32, // unit image
    pub disk_start: u64,  // unit disk
}

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
struct RawHeader {
    identity: [u8; 16],
    image_unit_size: LE<u32>,
    disk_unit_size: LE<u32>,
    region_count: LE<u32>,
}

const HEADER_SIZE: usize = mem::size_of::<RawHeader>();

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
struct RawRegion {
    image_count: LE<u32>,
    image_start: LE<u32>,
    disk_start: LE<u64>,
}

const REGION_SIZE: usize = mem::size_of::<RawRegion>();

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionList {
    identity: [u8; 16],
    image_unit_size: u32,
    disk_unit_size: u32,
    regions: Vec<Region>,
}

impl RegionList {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { identity: IDENTITY, image_unit_size: IMAGE_UNIT_SIZE, disk_unit_size: DISK_UNIT_SIZE, regions }
    }

    /// Parse a snapshot, the region count bounded by the buffer
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let header: [u8; HEADER_SIZE] =
            bytes.get(..HEADER_SIZE).and_then(|b| b.try_into().ok()).ok_or(Error::Corrupted("location header"))?;
        let header = unsafe { mem::transmute::<[u8; HEADER_SIZE], RawHeader>(header) };
        let (image_unit_size, disk_unit_size) = (header.image_unit_size.to_ne(), header.disk_unit_size.to_ne());
        if image_unit_size == 0 || disk_unit_size == 0 || image_unit_size % disk_unit_size != 0 {
            return Err(Error::Corrupted("location unit size"));
        }
        let count = header.region_count.to_ne() as usize;
        let body = &bytes[HEADER_SIZE..];
        if count > body.len() / REGION_SIZE {
            warn!("Region count {} exceeds {} bytes of location", count, bytes.len());
            return Err(Error::Corrupted("location region count"));
        }
        let regions = body.chunks_exact(REGION_SIZE).take(count).map(|chunk| {
            let mut raw = [0u8; REGION_SIZE];
            raw.copy_from_slice(chunk);
            let raw = unsafe { mem::transmute::<[u8; REGION_SIZE], RawRegion>(raw) };
            Region {
                image_start: raw.image_start.to_ne(),
                image_count: raw.image_count.to_ne(),
                disk_start: raw.disk_start.to_ne(),
            }
        });
        Ok(Self { identity: header.identity, image_unit_size, disk_unit_size, regions: regions.collect() })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let header = RawHeader {
            identity: self.identity,
            image_unit_size: self.image_unit_size.into(),
            disk_unit_size: self.disk_unit_size.into(),
            region_count: (self.regions.len() as u32).into(),
        };
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.regions.len() * REGION_SIZE);
        bytes.extend_from_slice(&unsafe { mem::transmute::<RawHeader, [u8; HEADER_SIZE]>(header) });
        for region in self.regions.iter() {
            let raw = RawRegion {
                image_count: region.image_count.into(),
                image_start: region.image_start.into(),
                disk_start: region.disk_start.into(),
            };
            bytes.extend_from_slice(&unsafe { mem::transmute::<RawRegion, [u8; REGION_SIZE]>(raw) });
        }
        bytes
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn has_identity(&self) -> bool {
        self.identity == IDENTITY
    }

    /// Disk units per image unit, 4 normally
    pub fn unit_ratio(&self) -> u64 {
        (self.image_unit_size / self.disk_unit_size) as u64
    }

    pub fn image_unit_size(&self) -> u32 {
        self.image_unit_size
    }

    pub fn disk_unit_size(&self) -> u32 {
        self.disk_unit_size
    }
}

/// Device-mapper linear table of the image over its partition
pub struct LinearTable<'a> {
    pub list: &'a RegionList,
    pub device: &'a str,
    pub partition_start: u64, // unit disk
}

impl<'a> Display for LinearTable<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let ratio = self.list.unit_ratio();
        for region in self.list.regions() {
            let start = region.image_start as u64 * ratio;
            let count = region.image_count as u64 * ratio;
            let offset = region.disk_start.saturating_sub(self.partition_start);
            writeln!(f, "{} {} linear {} {}", start, count, self.device, offset)?;
        }
        Ok(())
    }
}
