//! Runtime parameter record handed over by the boot stage.
//!
//! The record is a 512 byte packed structure, found in firmware tables, an EFI
//! variable or low physical memory. A candidate is only trusted when it carries
//! the identity GUID and all of its bytes sum to zero.

use core::fmt::{Debug, Formatter};
use core::mem;

use crate::endian::Little as LE;

pub const RECORD_SIZE: usize = 512;

/// GUID `77772020-2e77-6576-6e74-6f792e6e6574` in its mixed-endian encoding
pub const IDENTITY: [u8; 16] = hex!("20 20 77 77 77 2e 76 65 6e 74 6f 79 2e 6e 65 74");

const IMAGE_PATH_SIZE: usize = 384;

/// Filesystem of the partition holding the image
#[derive(Copy, Clone, Debug, PartialEq, Eq, derive_more::Display)]
pub enum FilesystemKind {
    #[display("exfat")]
    ExFAT,
    #[display("ntfs")]
    NTFS,
    #[display("ext")]
    Ext,
    #[display("xfs")]
    XFS,
    #[display("udf")]
    UDF,
    #[display("fat")]
    FAT,
    #[display("unknown")]
    Unknown(u16),
}

impl From<u16> for FilesystemKind {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::ExFAT,
            1 => Self::NTFS,
            2 => Self::Ext,
            3 => Self::XFS,
            4 => Self::UDF,
            5 => Self::FAT,
            _ => Self::Unknown(value),
        }
    }
}

impl From<FilesystemKind> for u16 {
    fn from(kind: FilesystemKind) -> u16 {
        match kind {
            FilesystemKind::ExFAT => 0,
            FilesystemKind::NTFS => 1,
            FilesystemKind::Ext => 2,
            FilesystemKind::XFS => 3,
            FilesystemKind::UDF => 4,
            FilesystemKind::FAT => 5,
            FilesystemKind::Unknown(value) => value,
        }
    }
}

#[derive(Copy, Clone)]
#[repr(C, packed(1))]
pub struct ParamRecord {
    identity: [u8; 16],
    checksum: u8,
    disk_identity: [u8; 16],
    disk_size: LE<u64>,      // unit byte
    partition_index: LE<u16>, // begin with 1
    filesystem_kind: LE<u16>,
    image_path: [u8; IMAGE_PATH_SIZE], // NUL terminated UTF-8
    image_size: LE<u64>,
    snapshot_address: LE<u64>, // 0 if absent, 4KiB aligned
    snapshot_length: LE<u32>,
    _reserved1: [u8; 32],
    _reserved2: [u8; 31],
}

const _: () = assert!(mem::size_of::<ParamRecord>() == RECORD_SIZE);

/// Wrapping sum of all bytes
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}

/// Identity matches and the full record sums to zero
pub fn is_valid(bytes: &[u8]) -> bool {
    let bytes = match bytes.get(..RECORD_SIZE) {
        Some(bytes) => bytes,
        None => return false,
    };
    if bytes[..IDENTITY.len()] != IDENTITY {
        return false;
    }
    let sum = checksum(bytes);
    if sum != 0 {
        debug!("Invalid checksum 0x{:02x}", sum);
        return false;
    }
    true
}

/// First valid record at a multiple of `stride`
pub fn scan(buffer: &[u8], stride: usize) -> Option<(usize, ParamRecord)> {
    let last = buffer.len().checked_sub(RECORD_SIZE)?;
    (0..=last).step_by(stride.max(1)).find_map(|offset| {
        let record = ParamRecord::parse(&buffer[offset..])?;
        trace!("Parameter record found at offset 0x{:x}", offset);
        Some((offset, record))
    })
}

impl ParamRecord {
    /// Copy of the leading 512 bytes, not validated
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; RECORD_SIZE] = bytes.get(..RECORD_SIZE)?.try_into().ok()?;
        Some(unsafe { mem::transmute::<[u8; RECORD_SIZE], Self>(bytes) })
    }

    /// Validated copy of the leading 512 bytes
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match is_valid(bytes) {
            true => Self::from_bytes(bytes),
            false => None,
        }
    }

    pub fn as_bytes(&self) -> [u8; RECORD_SIZE] {
        unsafe { mem::transmute::<Self, [u8; RECORD_SIZE]>(*self) }
    }

    pub fn is_valid(&self) -> bool {
        is_valid(&self.as_bytes())
    }

    /// A sealed record of current boot, mostly for fixtures and tools
    pub fn new(
        disk_identity: [u8; 16],
        disk_size: u64,
        partition_index: u16,
        filesystem_kind: FilesystemKind,
        image_path: &str,
        image_size: u64,
    ) -> Self {
        let mut path = [0u8; IMAGE_PATH_SIZE];
        let length = image_path.len().min(IMAGE_PATH_SIZE - 1);
        path[..length].copy_from_slice(&image_path.as_bytes()[..length]);
        let mut record = Self {
            identity: IDENTITY,
            checksum: 0,
            disk_identity,
            disk_size: disk_size.into(),
            partition_index: partition_index.into(),
            filesystem_kind: u16::from(filesystem_kind).into(),
            image_path: path,
            image_size: image_size.into(),
            snapshot_address: 0u64.into(),
            snapshot_length: 0u32.into(),
            _reserved1: [0u8; 32],
            _reserved2: [0u8; 31],
        };
        record.seal();
        record
    }

    pub fn with_snapshot(mut self, address: u64, length: u32) -> Self {
        self.snapshot_address = address.into();
        self.snapshot_length = length.into();
        self.seal();
        self
    }

    /// Recompute checksum so that all bytes sum to zero
    pub fn seal(&mut self) {
        self.checksum = 0;
        self.checksum = 0u8.wrapping_sub(checksum(&self.as_bytes()));
    }

    pub fn identity(&self) -> [u8; 16] {
        self.identity
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    pub fn disk_identity(&self) -> [u8; 16] {
        self.disk_identity
    }

    pub fn disk_size(&self) -> u64 {
        self.disk_size.to_ne()
    }

    pub fn partition_index(&self) -> u16 {
        self.partition_index.to_ne()
    }

    pub fn filesystem_kind(&self) -> FilesystemKind {
        FilesystemKind::from(self.filesystem_kind.to_ne())
    }

    /// Up to the first NUL, invalid UTF-8 replaced
    pub fn image_path(&self) -> String {
        let path = self.image_path;
        let length = path.iter().position(|&b| b == 0).unwrap_or(path.len());
        String::from_utf8_lossy(&path[..length]).into_owned()
    }

    pub fn image_size(&self) -> u64 {
        self.image_size.to_ne()
    }

    pub fn snapshot_address(&self) -> u64 {
        self.snapshot_address.to_ne()
    }

    pub fn snapshot_length(&self) -> u32 {
        self.snapshot_length.to_ne()
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot_address() != 0 && self.snapshot_length() != 0
    }
}

impl Debug for ParamRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParamRecord")
            .field("checksum", &self.checksum)
            .field("disk_identity", &self.disk_identity)
            .field("disk_size", &self.disk_size())
            .field("partition_index", &self.partition_index())
            .field("filesystem_kind", &self.filesystem_kind())
            .field("image_path", &self.image_path())
            .field("image_size", &self.image_size())
            .field("snapshot_address", &self.snapshot_address())
            .field("snapshot_length", &self.snapshot_length())
            .finish()
    }
}

impl PartialEq for ParamRecord {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}
