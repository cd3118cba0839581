use core::mem::{self, transmute};

use bitfield::bitfield;

use crate::endian::Little as LE;

pub(crate) const ENTRY_SIZE: usize = 32;
pub(crate) type RawEntry = [u8; ENTRY_SIZE];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum EntryType {
    AllocationBitmap,
    UpcaseTable,
    VolumeLabel,
    FileDirectory,
    VolumeGUID,
    TexFATPadding,
    StreamExtension,
    Filename,
    VendorExtension,
    VendorAllocation,
}

impl TryFrom<u8> for EntryType {
    type Error = u8;
    fn try_from(byte: u8) -> Result<Self, u8> {
        let value = match byte {
            // critical primary
            0x1 => Self::AllocationBitmap,
            0x2 => Self::UpcaseTable,
            0x3 => Self::VolumeLabel,
            0x5 => Self::FileDirectory,
            // benign primary
            0x20 => Self::VolumeGUID,
            0x21 => Self::TexFATPadding,
            // critical secondary
            0x40 => Self::StreamExtension,
            0x41 => Self::Filename,
            // benign secondary
            0x60 => Self::VendorExtension,
            0x61 => Self::VendorAllocation,
            _ => return Err(byte),
        };
        Ok(value)
    }
}

impl From<EntryType> for u8 {
    fn from(entry_type: EntryType) -> u8 {
        match entry_type {
            EntryType::AllocationBitmap => 0x1,
            EntryType::UpcaseTable => 0x2,
            EntryType::VolumeLabel => 0x3,
            EntryType::FileDirectory => 0x5,
            EntryType::VolumeGUID => 0x20,
            EntryType::TexFATPadding => 0x21,
            EntryType::StreamExtension => 0x40,
            EntryType::Filename => 0x41,
            EntryType::VendorExtension => 0x60,
            EntryType::VendorAllocation => 0x61,
        }
    }
}

#[derive(Copy, Clone, Default, Debug, PartialEq)]
pub(crate) struct RawEntryType(u8);

impl RawEntryType {
    #[cfg(test)]
    pub fn new(entry_type: EntryType, in_use: bool) -> Self {
        Self(u8::from(entry_type) | if in_use { 0x80 } else { 0 })
    }

    pub fn in_use(&self) -> bool {
        self.0 & 0x80 > 0
    }

    pub fn entry_type(&self) -> Result<EntryType, u8> {
        EntryType::try_from(self.0 & 0x7F)
    }

    pub fn is_end_of_directory(&self) -> bool {
        self.0 == 0
    }

    /// In use and of specified type
    pub fn is(&self, entry_type: EntryType) -> bool {
        self.in_use() && self.entry_type() == Ok(entry_type)
    }
}

impl From<u8> for RawEntryType {
    fn from(byte: u8) -> Self {
        Self(byte)
    }
}

impl From<RawEntryType> for u8 {
    fn from(entry_type: RawEntryType) -> u8 {
        entry_type.0
    }
}

bitfield! {
    #[derive(Copy, Clone, Default, PartialEq)]
    pub struct Flags(u8);
    impl Debug;
    pub allocation_possible, set_allocation_possible: 0;
    pub no_fat_chain, set_no_fat_chain: 1;
}

bitfield! {
    #[derive(Copy, Clone, Default)]
    pub struct FileAttributes(u16);
    impl Debug;
    pub read_only, _: 0;
    pub hidden, _: 1;
    pub system, _: 2;
    pub directory, set_directory: 4;
    pub archive, set_archive: 5;
}

#[derive(Copy, Clone, Debug, Default)]
#[repr(C, packed(1))]
pub(crate) struct FileDirectory {
    pub entry_type: RawEntryType,
    pub secondary_count: u8,
    pub set_checksum: LE<u16>,
    pub file_attributes: LE<u16>,
    _reserved1: [u8; 2],
    _timestamps: [u8; 17],
    _reserved2: [u8; 7],
}

impl FileDirectory {
    pub fn file_attributes(&self) -> FileAttributes {
        FileAttributes(self.file_attributes.to_ne())
    }
}

#[derive(Copy, Clone, Debug, Default)]
#[repr(C, packed(1))]
pub(crate) struct StreamExtension {
    pub entry_type: RawEntryType,
    pub general_secondary_flags: u8,
    _reserved1: u8,
    pub name_length: u8,
    pub name_hash: LE<u16>,
    _reserved2: [u8; 2],
    pub valid_data_length: LE<u64>,
    _reserved3: [u8; 4],
    pub first_cluster: LE<u32>,
    pub data_length: LE<u64>,
}

impl StreamExtension {
    pub fn flags(&self) -> Flags {
        Flags(self.general_secondary_flags)
    }
}

#[derive(Copy, Clone, Debug, Default)]
#[repr(C, packed(1))]
pub(crate) struct Filename {
    pub entry_type: RawEntryType,
    pub general_secondary_flags: u8,
    pub filename: [LE<u16>; 15],
}

impl Filename {
    pub fn units(&self) -> [u16; 15] {
        let filename = self.filename;
        filename.map(|unit| unit.to_ne())
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(C, packed(1))]
pub(crate) struct UpcaseTable {
    pub entry_type: RawEntryType,
    _reserved1: [u8; 3],
    pub table_checksum: LE<u32>,
    _reserved2: [u8; 12],
    pub first_cluster: LE<u32>,
    pub data_length: LE<u64>,
}

macro_rules! raw_entry {
    ($($type:ty),+) => {
        $(
            impl From<RawEntry> for $type {
                fn from(entry: RawEntry) -> Self {
                    unsafe { transmute::<RawEntry, Self>(entry) }
                }
            }

            impl From<$type> for RawEntry {
                fn from(entry: $type) -> Self {
                    unsafe { transmute::<$type, Self>(entry) }
                }
            }
        )+
    };
}

raw_entry!(FileDirectory, StreamExtension, Filename, UpcaseTable);

const _: () = assert!(mem::size_of::<FileDirectory>() == ENTRY_SIZE);
const _: () = assert!(mem::size_of::<StreamExtension>() == ENTRY_SIZE);
const _: () = assert!(mem::size_of::<Filename>() == ENTRY_SIZE);
const _: () = assert!(mem::size_of::<UpcaseTable>() == ENTRY_SIZE);

#[derive(Default)]
pub(crate) struct Checksum(u16);

impl Checksum {
    pub fn write(&mut self, byte: u8) {
        let carry = if self.0 & 1 > 0 { 0x8000 } else { 0 };
        self.0 = (carry | (self.0 >> 1)).wrapping_add(byte as u16)
    }

    pub fn sum(&self) -> u16 {
        self.0
    }
}

/// Hash over up-cased UTF-16 name, stored in stream extension
pub(crate) fn name_hash(upcased: &[u16]) -> u16 {
    let mut checksum = Checksum::default();
    for unit in upcased {
        let [low, high] = unit.to_le_bytes();
        checksum.write(low);
        checksum.write(high);
    }
    checksum.sum()
}

/// Checksum over the whole up-case table, stored in its directory entry
pub(crate) fn table_checksum(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |sum, &byte| ((sum & 1) << 31).wrapping_add(sum >> 1).wrapping_add(byte as u32))
}

/// Set checksum over primary and secondary entries, skipping the checksum field itself
pub(crate) fn set_checksum(entries: &[RawEntry]) -> u16 {
    let mut checksum = Checksum::default();
    for (index, entry) in entries.iter().enumerate() {
        for (i, &byte) in entry.iter().enumerate() {
            if index == 0 && (i == 2 || i == 3) {
                continue;
            }
            checksum.write(byte);
        }
    }
    checksum.sum()
}
