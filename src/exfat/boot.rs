// Main boot sector, only the volume parameters a reader needs

use core::mem;

use crate::endian::Little as LE;

#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub(crate) struct BootSector {
    pub jump_boot: [u8; 3],
    pub filesystem_name: [u8; 8],
    _must_be_zero: [u8; 53],
    pub partition_offset: LE<u64>, // shall ignore when 0
    pub volume_length: LE<u64>,
    pub fat_offset: LE<u32>,          // unit sector
    pub fat_length: LE<u32>,          // unit sector
    pub cluster_heap_offset: LE<u32>, // unit sector
    pub cluster_count: LE<u32>,
    pub first_cluster_of_root_directory: LE<u32>,
    pub volume_serial_number: LE<u32>,
    pub filesystem_revision: LE<u16>,
    pub volume_flags: LE<u16>,
    pub bytes_per_sector_shift: u8, // [9..=12]
    pub sectors_per_cluster_shift: u8,
    pub number_of_fats: u8,
    pub drive_select: u8,
    pub percent_inuse: u8,
    _reserved: [u8; 7],
    pub bootcode: [u8; 390],
    pub boot_signature: [u8; 2],
}

impl BootSector {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; 512] = bytes.get(..512)?.try_into().ok()?;
        Some(unsafe { mem::transmute::<[u8; 512], Self>(bytes) })
    }

    pub fn is_exfat(&self) -> bool {
        self.jump_boot == hex!("EB 76 90") && &self.filesystem_name == b"EXFAT   "
    }

    /// Sector size 512 ~ 4096 and cluster size up to 32MB
    pub fn has_sane_geometry(&self) -> bool {
        let shift = self.bytes_per_sector_shift;
        (9..=12).contains(&shift) && self.sectors_per_cluster_shift <= 25 - shift
    }
}
