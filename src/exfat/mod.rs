//! Read-only exFAT reader, just enough to find a file and walk its clusters.

mod boot;
mod chain;
mod entry;
pub mod error;
mod fat;
#[cfg(test)]
pub(crate) mod image;
mod upcase;

use core::fmt::Debug;

use crate::io;
use crate::types::{ClusterID, SectorID};
use entry::{EntryType, FileDirectory, Filename, RawEntry, RawEntryType, StreamExtension, ENTRY_SIZE};
pub use chain::Chain;
pub use error::{DataError, Error};
use upcase::UpcaseTable;

/// File or directory found by walking directory entry sets
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    name: String,
    first_cluster: ClusterID,
    data_length: u64,
    valid_data_length: u64,
    directory: bool,
    contiguous: bool,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn first_cluster(&self) -> ClusterID {
        self.first_cluster
    }

    pub fn data_length(&self) -> u64 {
        self.data_length
    }

    pub fn valid_data_length(&self) -> u64 {
        self.valid_data_length
    }

    pub fn is_directory(&self) -> bool {
        self.directory
    }

    /// Allocated as one run of clusters without FAT chain
    pub fn is_contiguous(&self) -> bool {
        self.contiguous
    }
}

pub struct ExFAT<IO> {
    io: IO,
    fat_info: fat::Info,
    heap_offset: u32, // unit sector
    sector_size_shift: u8,
    sectors_per_cluster_shift: u8,
    cluster_count: u32,
    root: ClusterID,
    upcase_table: UpcaseTable,
}

impl<E: Debug, IO: io::IO<Error = E>> ExFAT<IO> {
    pub fn new(mut io: IO) -> Result<Self, Error<E>> {
        let sector = io.read(SectorID::BOOT).map_err(|e| Error::IO(e))?;
        let boot_sector = boot::BootSector::from_bytes(sector).ok_or(DataError::NotExFAT)?;
        if !boot_sector.is_exfat() {
            return Err(DataError::NotExFAT.into());
        }
        if !boot_sector.has_sane_geometry() {
            return Err(DataError::Geometry.into());
        }
        if boot_sector.number_of_fats > 1 {
            return Err(Error::TexFATNotSupported);
        }
        let fat_offset = boot_sector.fat_offset.to_ne();
        let fat_length = boot_sector.fat_length.to_ne();
        debug!("FAT offset {} length {}", fat_offset, fat_length);

        let sector_size_shift = boot_sector.bytes_per_sector_shift;
        io.set_sector_size_shift(sector_size_shift).map_err(|e| Error::IO(e))?;
        let root = ClusterID::from(boot_sector.first_cluster_of_root_directory.to_ne());
        debug!("Root directory on cluster {}", root);
        debug!("Volume serial number {:08X}", boot_sector.volume_serial_number.to_ne());
        let mut exfat = Self {
            io,
            fat_info: fat::Info::new(sector_size_shift, fat_offset, fat_length),
            heap_offset: boot_sector.cluster_heap_offset.to_ne(),
            sector_size_shift,
            sectors_per_cluster_shift: boot_sector.sectors_per_cluster_shift,
            cluster_count: boot_sector.cluster_count.to_ne(),
            root,
            upcase_table: UpcaseTable::default(),
        };
        exfat.upcase_table = exfat.load_upcase_table()?;
        Ok(exfat)
    }

    pub fn cluster_size(&self) -> u32 {
        1 << (self.sector_size_shift + self.sectors_per_cluster_shift)
    }

    /// Within the cluster heap
    pub fn is_valid(&self, cluster_id: ClusterID) -> bool {
        let id = u32::from(cluster_id) as u64;
        id >= u32::from(ClusterID::FIRST) as u64 && id < self.cluster_count as u64 + 2
    }

    /// Byte offset of a valid cluster from the start of the volume
    pub fn cluster_offset(&self, cluster_id: ClusterID) -> u64 {
        let heap = (self.heap_offset as u64) << self.sector_size_shift;
        heap + ((cluster_id.heap_index() as u64) << (self.sector_size_shift + self.sectors_per_cluster_shift))
    }

    /// Raw FAT value of specified cluster
    pub fn fat_entry(&mut self, cluster_id: ClusterID) -> Result<u32, Error<E>> {
        let sector_id = self.fat_info.sector_id(cluster_id).ok_or(DataError::FATChain)?;
        let sector = self.io.read(sector_id).map_err(|e| Error::IO(e))?;
        Ok(self.fat_info.entry(sector, cluster_id))
    }

    pub fn root(&self) -> Node {
        Node {
            name: String::from("/"),
            first_cluster: self.root,
            data_length: 0,
            valid_data_length: 0,
            directory: true,
            contiguous: false,
        }
    }

    /// Absolute path with `/` separators, matched case-insensitively
    pub fn lookup(&mut self, path: &str) -> Result<Node, Error<E>> {
        let mut node = self.root();
        for name in path.split('/').filter(|name| !name.is_empty()) {
            if !node.directory {
                return Err(Error::NotFound);
            }
            let upcased = self.upcase_table.to_upper(name);
            let nodes = self.entries(&node)?;
            let found = nodes.into_iter().find(|n| self.upcase_table.to_upper(&n.name) == upcased);
            node = found.ok_or(Error::NotFound)?;
            trace!("Found {} on cluster {}", node.name, node.first_cluster);
        }
        Ok(node)
    }

    /// In-use files and directories of a directory
    pub fn entries(&mut self, directory: &Node) -> Result<Vec<Node>, Error<E>> {
        let entries = self.read_directory(directory)?;
        let mut nodes = Vec::new();
        let mut index = 0;
        while index < entries.len() {
            let entry_type = RawEntryType::from(entries[index][0]);
            if entry_type.is_end_of_directory() {
                break;
            }
            if !entry_type.is(EntryType::FileDirectory) {
                if entry_type.in_use() && entry_type.entry_type().is_err() {
                    warn!("Unexpected entry type {}", u8::from(entry_type));
                    return Err(DataError::Metadata.into());
                }
                index += 1;
                continue;
            }
            let count = entries[index][1] as usize;
            let entryset = entries.get(index..index + 1 + count).ok_or(DataError::Metadata)?;
            nodes.push(self.parse_entryset(entryset)?);
            index += 1 + count;
        }
        Ok(nodes)
    }

    pub fn chain(&mut self, node: &Node) -> Chain<'_, IO> {
        Chain::new(self, node.first_cluster, node.contiguous)
    }

    fn parse_entryset(&self, entryset: &[RawEntry]) -> Result<Node, Error<E>> {
        if entryset.len() < 3 {
            return Err(DataError::Metadata.into());
        }
        let file_directory = FileDirectory::from(entryset[0]);
        let checksum = entry::set_checksum(entryset);
        if file_directory.set_checksum.to_ne() != checksum {
            warn!("Entry set checksum {:04X} mismatch", checksum);
            return Err(DataError::Metadata.into());
        }
        if !RawEntryType::from(entryset[1][0]).is(EntryType::StreamExtension) {
            return Err(DataError::Metadata.into());
        }
        let stream = StreamExtension::from(entryset[1]);
        let name_length = stream.name_length as usize;
        let mut units = Vec::with_capacity(name_length);
        for raw in entryset[2..].iter() {
            if !RawEntryType::from(raw[0]).is(EntryType::Filename) {
                break;
            }
            units.extend_from_slice(&Filename::from(*raw).units());
        }
        if units.len() < name_length {
            return Err(DataError::Metadata.into());
        }
        units.truncate(name_length);
        let upcased: Vec<u16> = units.iter().map(|&unit| self.upcase_table.lookup(unit)).collect();
        if entry::name_hash(&upcased) != stream.name_hash.to_ne() {
            warn!("Name hash mismatch for {}", String::from_utf16_lossy(&units));
        }
        Ok(Node {
            name: String::from_utf16_lossy(&units),
            first_cluster: ClusterID::from(stream.first_cluster.to_ne()),
            data_length: stream.data_length.to_ne(),
            valid_data_length: stream.valid_data_length.to_ne(),
            directory: file_directory.file_attributes().directory(),
            contiguous: stream.flags().no_fat_chain(),
        })
    }

    /// Clusters of a chain, following FAT unless contiguous
    fn read_chain(
        &mut self,
        first: ClusterID,
        contiguous: bool,
        length: Option<u64>,
    ) -> Result<Vec<ClusterID>, Error<E>> {
        let limit = match length {
            Some(length) => length.div_ceil(self.cluster_size() as u64),
            None if contiguous => 1,
            None => self.cluster_count as u64,
        };
        let mut clusters = Vec::new();
        let mut cluster_id = first;
        while (clusters.len() as u64) < limit {
            if !self.is_valid(cluster_id) {
                warn!("Cluster {} out of heap", cluster_id);
                return Err(DataError::FATChain.into());
            }
            clusters.push(cluster_id);
            if contiguous {
                cluster_id = cluster_id + 1u32;
                continue;
            }
            match fat::Entry::try_from(self.fat_entry(cluster_id)?) {
                Ok(fat::Entry::Next(next)) => cluster_id = next,
                Ok(fat::Entry::Last) => break,
                _ => return Err(DataError::FATChain.into()),
            }
        }
        Ok(clusters)
    }

    fn read_cluster(&mut self, cluster_id: ClusterID, bytes: &mut Vec<u8>) -> Result<(), Error<E>> {
        let first = self.heap_offset as u64 + ((cluster_id.heap_index() as u64) << self.sectors_per_cluster_shift);
        for i in 0..(1u64 << self.sectors_per_cluster_shift) {
            let sector = self.io.read(SectorID::from(first + i)).map_err(|e| Error::IO(e))?;
            bytes.extend_from_slice(sector);
        }
        Ok(())
    }

    fn read_data(&mut self, first: ClusterID, contiguous: bool, length: Option<u64>) -> Result<Vec<u8>, Error<E>> {
        let clusters = self.read_chain(first, contiguous, length)?;
        let mut bytes = Vec::with_capacity(clusters.len() * self.cluster_size() as usize);
        for cluster_id in clusters {
            self.read_cluster(cluster_id, &mut bytes)?;
        }
        if let Some(length) = length {
            bytes.truncate(length as usize);
        }
        Ok(bytes)
    }

    fn read_directory(&mut self, directory: &Node) -> Result<Vec<RawEntry>, Error<E>> {
        let length = match directory.data_length {
            0 => None,
            length => Some(length),
        };
        let bytes = self.read_data(directory.first_cluster, directory.contiguous, length)?;
        let mut entries = Vec::with_capacity(bytes.len() / ENTRY_SIZE);
        for chunk in bytes.chunks_exact(ENTRY_SIZE) {
            let mut entry: RawEntry = [0u8; ENTRY_SIZE];
            entry.copy_from_slice(chunk);
            entries.push(entry);
        }
        Ok(entries)
    }

    fn load_upcase_table(&mut self) -> Result<UpcaseTable, Error<E>> {
        let root = self.root();
        let entries = self.read_directory(&root)?;
        let entry = entries
            .iter()
            .take_while(|entry| !RawEntryType::from(entry[0]).is_end_of_directory())
            .find(|entry| RawEntryType::from(entry[0]).is(EntryType::UpcaseTable))
            .map(|entry| entry::UpcaseTable::from(*entry))
            .ok_or(DataError::UpcaseTableMissing)?;
        let first_cluster = ClusterID::from(entry.first_cluster.to_ne());
        let data_length = entry.data_length.to_ne();
        debug!("Upcase table on cluster {} length {}", first_cluster, data_length);
        let bytes = self.read_data(first_cluster, false, Some(data_length))?;
        let checksum = entry::table_checksum(&bytes);
        if checksum != entry.table_checksum.to_ne() {
            warn!("Upcase table checksum {:08x} mismatch, expect {:08x}", checksum, entry.table_checksum.to_ne());
            return Err(DataError::Metadata.into());
        }
        let units: Vec<u16> = bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect();
        Ok(UpcaseTable::decode(&units))
    }
}
