//! Identify the disk the runtime parameters refer to.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::io::BLOCK_SIZE;
use crate::platform::Platform;
use crate::record::ParamRecord;

/// Disk identity is kept in the MBR boot code area
pub const DISK_IDENTITY_OFFSET: u64 = 0x180;
/// Assumed when sysfs does not tell the partition start, unit sector
pub const DEFAULT_PARTITION_START: u64 = 2048;

pub trait BlockDevices {
    fn names(&mut self) -> Result<Vec<String>>;
    /// Unit byte
    fn size(&mut self, name: &str) -> Result<u64>;
    fn identity(&mut self, name: &str) -> Result<[u8; 16]>;
}

/// Block devices as listed in sysfs and opened through devfs
pub struct SysBlock<'a> {
    platform: &'a Platform,
}

impl<'a> SysBlock<'a> {
    pub fn new(platform: &'a Platform) -> Self {
        Self { platform }
    }

    fn sysfs_size(&self, name: &str) -> Option<u64> {
        let path = self.platform.sys_block.join(name).join("size");
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => {
                debug!("{} not exist", path.display());
                return None;
            }
        };
        text.trim().parse::<u64>().ok().map(|sectors| sectors * BLOCK_SIZE as u64)
    }

    /// Start sector of partition, falls back to 2048
    pub fn partition_start(&self, partition: &str) -> u64 {
        let path = self.platform.sys_class_block.join(partition).join("start");
        match fs::read_to_string(&path).ok().and_then(|text| text.trim().parse().ok()) {
            Some(start) => start,
            None => {
                debug!("{} not exist", path.display());
                DEFAULT_PARTITION_START
            }
        }
    }
}

impl<'a> BlockDevices for SysBlock<'a> {
    fn names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.platform.sys_block)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn size(&mut self, name: &str) -> Result<u64> {
        if let Some(size) = self.sysfs_size(name) {
            return Ok(size);
        }
        let mut file = File::open(self.platform.device(name))?;
        Ok(file.seek(SeekFrom::End(0))?)
    }

    fn identity(&mut self, name: &str) -> Result<[u8; 16]> {
        let mut file = File::open(self.platform.device(name))?;
        file.seek(SeekFrom::Start(DISK_IDENTITY_OFFSET))?;
        let mut identity = [0u8; 16];
        file.read_exact(&mut identity)?;
        trace!("Identity of {}: {:02x?}", name, identity);
        Ok(identity)
    }
}

/// Ramdisks, loop devices, device-mapper and optical drives never carry the image
pub fn is_possible_device(name: &str) -> bool {
    if name.starts_with('.') {
        return false;
    }
    !["ram", "loop", "dm-", "sr"].iter().any(|prefix| name.starts_with(prefix))
}

/// Partition naming of kernel, `nvme0n1p1` but `sda1`
pub fn partition_name(disk: &str, index: u16) -> String {
    match ["nvme", "mmc", "nbd"].iter().any(|kind| disk.contains(kind)) {
        true => format!("{}p{}", disk, index),
        false => format!("{}{}", disk, index),
    }
}

/// Partition of the resolved disk holding the image
#[derive(Clone, Debug, PartialEq)]
pub struct Partition {
    pub name: String,
    pub device: PathBuf,
    pub start: u64, // unit sector
}

impl Partition {
    pub fn new(platform: &Platform, disk: &str, index: u16) -> Self {
        let name = partition_name(disk, index);
        let start = SysBlock::new(platform).partition_start(&name);
        debug!("Partition {} starts at sector {}", name, start);
        Self { device: platform.device(&name), name, start }
    }

    /// Unit byte
    pub fn offset(&self) -> u64 {
        self.start * BLOCK_SIZE as u64
    }
}

fn identity_matches<D: BlockDevices>(devices: &mut D, name: &str, expected: &[u8; 16]) -> bool {
    match devices.identity(name) {
        Ok(identity) => identity == *expected,
        Err(e) => {
            debug!("Failed to read identity of {}: {}", name, e);
            false
        }
    }
}

/// Name of the only disk matching size and identity of the record
pub fn resolve<D: BlockDevices>(record: &ParamRecord, devices: &mut D) -> Result<String> {
    let names: Vec<String> = devices.names()?.into_iter().filter(|name| is_possible_device(name)).collect();
    let disk_size = record.disk_size();
    let expected = record.disk_identity();

    let mut sized = Vec::new();
    for name in names.iter() {
        match devices.size(name) {
            Ok(size) => {
                debug!("Disk {} size {}", name, size);
                if size == disk_size {
                    sized.push(name.clone());
                }
            }
            Err(e) => debug!("Failed to get size of {}: {}", name, e),
        }
    }
    debug!("{} disks of size {}", sized.len(), disk_size);

    let mut candidates = match sized.len() {
        1 => match identity_matches(devices, &sized[0], &expected) {
            true => sized,
            false => {
                debug!("{} is not the expected disk", sized[0]);
                Vec::new()
            }
        },
        _ => {
            let mut matched = Vec::new();
            for name in names.iter() {
                if identity_matches(devices, name, &expected) {
                    matched.push(name.clone());
                }
            }
            debug!("{} disks of expected identity", matched.len());
            matched
        }
    };
    match candidates.len() {
        0 => Err(Error::DiskNotFound),
        1 => Ok(candidates.swap_remove(0)),
        count => Err(Error::DiskAmbiguous(count)),
    }
}
