//! Synthetic exFAT volume for tests.
//!
//! 512B sectors, 2KiB clusters, FAT at sector 24, cluster heap at sector 32
//! with 64 clusters. Root directory on cluster 2, upcase table on 3 and
//! directory `iso` on 4. `/iso/test.iso` is chained 10 -> 11 -> 12 -> 20 -> 21
//! and `/iso/flat.bin` occupies clusters 30..=33 without FAT chain.

use super::entry::{self, RawEntry, ENTRY_SIZE};
use crate::types::ClusterID;

pub(crate) const SECTOR_SIZE: usize = 512;
pub(crate) const CLUSTER_SIZE: usize = 2048;
pub(crate) const FAT_OFFSET: usize = 24;
pub(crate) const HEAP_OFFSET: usize = 32;
pub(crate) const CLUSTER_COUNT: usize = 64;
pub(crate) const TEST_ISO_LENGTH: u64 = 4 * CLUSTER_SIZE as u64 + 100;
pub(crate) const FLAT_BIN_LENGTH: u64 = 4 * CLUSTER_SIZE as u64;

const LAST: u32 = 0xFFFFFFFF;

pub(crate) struct ImageBuilder {
    bytes: Vec<u8>,
}

fn file_entryset(name: &str, directory: bool, first: u32, length: u64, contiguous: bool) -> Vec<RawEntry> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let upcased: Vec<u16> = name.to_ascii_uppercase().encode_utf16().collect();
    let num_names = units.len().div_ceil(15);
    let mut entries = vec![[0u8; ENTRY_SIZE]; 2 + num_names];

    entries[0][0] = 0x85;
    entries[0][1] = (1 + num_names) as u8;
    let attributes: u16 = if directory { 0x10 } else { 0x20 };
    entries[0][4..6].copy_from_slice(&attributes.to_le_bytes());

    entries[1][0] = 0xC0;
    entries[1][1] = if contiguous { 0b11 } else { 0b01 };
    entries[1][3] = units.len() as u8;
    entries[1][4..6].copy_from_slice(&entry::name_hash(&upcased).to_le_bytes());
    entries[1][8..16].copy_from_slice(&length.to_le_bytes());
    entries[1][20..24].copy_from_slice(&first.to_le_bytes());
    entries[1][24..32].copy_from_slice(&length.to_le_bytes());

    for (i, chunk) in units.chunks(15).enumerate() {
        let filename = &mut entries[2 + i];
        filename[0] = 0xC1;
        for (j, unit) in chunk.iter().enumerate() {
            filename[2 + j * 2..4 + j * 2].copy_from_slice(&unit.to_le_bytes());
        }
    }

    let checksum = entry::set_checksum(&entries);
    entries[0][2..4].copy_from_slice(&checksum.to_le_bytes());
    entries
}

impl ImageBuilder {
    pub fn new() -> Self {
        let mut bytes = vec![0u8; bytes_len()];
        let boot = &mut bytes[..SECTOR_SIZE];
        boot[..3].copy_from_slice(&hex!("EB 76 90"));
        boot[3..11].copy_from_slice(b"EXFAT   ");
        boot[72..80].copy_from_slice(&((bytes_len() / SECTOR_SIZE) as u64).to_le_bytes());
        boot[80..84].copy_from_slice(&(FAT_OFFSET as u32).to_le_bytes());
        boot[84..88].copy_from_slice(&8u32.to_le_bytes());
        boot[88..92].copy_from_slice(&(HEAP_OFFSET as u32).to_le_bytes());
        boot[92..96].copy_from_slice(&(CLUSTER_COUNT as u32).to_le_bytes());
        boot[96..100].copy_from_slice(&2u32.to_le_bytes());
        boot[100..104].copy_from_slice(&0x1234ABCDu32.to_le_bytes());
        boot[104..106].copy_from_slice(&0x0100u16.to_le_bytes());
        boot[108] = 9;
        boot[109] = 2;
        boot[110] = 1;
        boot[510..512].copy_from_slice(&hex!("55 AA"));
        let mut builder = Self { bytes };
        builder.set_fat(ClusterID::from(0), 0xFFFFFFF8);
        builder.set_fat(ClusterID::from(1), LAST);
        builder
    }

    pub fn set_fat(&mut self, cluster_id: ClusterID, value: u32) {
        let offset = FAT_OFFSET * SECTOR_SIZE + u32::from(cluster_id) as usize * 4;
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn chain(&mut self, clusters: &[u32]) {
        for pair in clusters.windows(2) {
            self.set_fat(ClusterID::from(pair[0]), pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.set_fat(ClusterID::from(last), LAST);
        }
    }

    pub fn cluster_mut(&mut self, cluster_id: ClusterID) -> &mut [u8] {
        let offset = HEAP_OFFSET * SECTOR_SIZE + (u32::from(cluster_id) as usize - 2) * CLUSTER_SIZE;
        &mut self.bytes[offset..offset + CLUSTER_SIZE]
    }

    pub fn write_entries(&mut self, cluster_id: ClusterID, entries: &[RawEntry]) {
        let cluster = self.cluster_mut(cluster_id);
        for (i, entry) in entries.iter().enumerate() {
            cluster[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE].copy_from_slice(entry);
        }
    }

    pub fn sample() -> Self {
        let mut builder = Self::new();

        let mut units: Vec<u16> = vec![0xFFFF, 0x61];
        units.extend(0x41u16..=0x5A);
        units.extend([0xFFFF, 0x05]);
        let upcase_length = (units.len() * 2) as u64;
        let cluster = builder.cluster_mut(ClusterID::from(3));
        for (i, unit) in units.iter().enumerate() {
            cluster[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }

        let mut bitmap: RawEntry = [0u8; ENTRY_SIZE];
        bitmap[0] = 0x81;
        bitmap[20..24].copy_from_slice(&5u32.to_le_bytes());
        bitmap[24..32].copy_from_slice(&8u64.to_le_bytes());
        let mut upcase: RawEntry = [0u8; ENTRY_SIZE];
        upcase[0] = 0x82;
        let checksum = entry::table_checksum(&builder.cluster_mut(ClusterID::from(3))[..upcase_length as usize]);
        upcase[4..8].copy_from_slice(&checksum.to_le_bytes());
        upcase[20..24].copy_from_slice(&3u32.to_le_bytes());
        upcase[24..32].copy_from_slice(&upcase_length.to_le_bytes());
        let mut root = vec![bitmap, upcase];
        root.extend(file_entryset("iso", true, 4, CLUSTER_SIZE as u64, false));
        builder.write_entries(ClusterID::from(2), &root);

        let mut iso = file_entryset("test.iso", false, 10, TEST_ISO_LENGTH, false);
        iso.extend(file_entryset("flat.bin", false, 30, FLAT_BIN_LENGTH, true));
        builder.write_entries(ClusterID::from(4), &iso);

        for cluster in [2u32, 3, 4, 5] {
            builder.set_fat(ClusterID::from(cluster), LAST);
        }
        builder.chain(&[10, 11, 12, 20, 21]);
        builder
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

fn bytes_len() -> usize {
    (HEAP_OFFSET + CLUSTER_COUNT * CLUSTER_SIZE / SECTOR_SIZE) * SECTOR_SIZE
}

pub(crate) fn sample() -> Vec<u8> {
    ImageBuilder::sample().build()
}
