//! Locate the disk regions of the image, trusting snapshots left by the boot
//! stage before deriving them from the filesystem.

use crate::disk::Partition;
use crate::error::{Error, Result};
use crate::exfat::{self, ExFAT};
use crate::extent;
use crate::io::std::FileIO;
use crate::location::RegionList;
use crate::platform::Platform;
use crate::record::{FilesystemKind, ParamRecord};
use crate::source::phymem::{DevMem, PhysicalMemory};
use crate::source::FirmwareTable;

pub trait LocationSource {
    fn name(&self) -> &str;
    /// `None` when the source has nothing to offer for this record
    fn try_resolve(&mut self, record: &ParamRecord) -> Result<Option<RegionList>>;
}

/// Image location copied by the boot stage into physical memory
pub struct PhysMemSnapshot<M> {
    memory: M,
}

impl<M: PhysicalMemory> PhysMemSnapshot<M> {
    pub fn new(memory: M) -> Self {
        Self { memory }
    }
}

impl<M: PhysicalMemory> LocationSource for PhysMemSnapshot<M> {
    fn name(&self) -> &str {
        "physical memory snapshot"
    }

    fn try_resolve(&mut self, record: &ParamRecord) -> Result<Option<RegionList>> {
        if !record.has_snapshot() {
            return Ok(None);
        }
        let (address, length) = (record.snapshot_address(), record.snapshot_length());
        debug!("Image location at physical memory 0x{:x} length {}", address, length);
        let bytes = self.memory.read(address, length as usize)?;
        RegionList::parse(&bytes).map(Some)
    }
}

/// Image location appended to the firmware table, sized by the table's own record
pub struct FirmwareTableSnapshot {
    table: FirmwareTable,
}

impl FirmwareTableSnapshot {
    pub fn new(table: FirmwareTable) -> Self {
        Self { table }
    }
}

impl LocationSource for FirmwareTableSnapshot {
    fn name(&self) -> &str {
        "firmware table snapshot"
    }

    fn try_resolve(&mut self, _: &ParamRecord) -> Result<Option<RegionList>> {
        match self.table.snapshot()? {
            Some(bytes) => RegionList::parse(&bytes).map(Some),
            None => Ok(None),
        }
    }
}

/// Derive the location from the cluster chain of the image on an exFAT partition
pub struct LiveExFAT {
    platform: Platform,
    disk: String,
}

impl LiveExFAT {
    pub fn new(platform: &Platform, disk: &str) -> Self {
        Self { platform: platform.clone(), disk: disk.to_string() }
    }
}

impl LocationSource for LiveExFAT {
    fn name(&self) -> &str {
        "exFAT filesystem"
    }

    fn try_resolve(&mut self, record: &ParamRecord) -> Result<Option<RegionList>> {
        let kind = record.filesystem_kind();
        if kind != FilesystemKind::ExFAT {
            return Err(Error::UnsupportedFilesystem(kind));
        }
        let partition = Partition::new(&self.platform, &self.disk, record.partition_index());
        debug!("Mount {} read-only", partition.device.display());
        let io = FileIO::open(&partition.device)?;
        let mut filesystem = ExFAT::new(io)?;
        let path = record.image_path();
        let node = filesystem.lookup(&path)?;
        if node.is_directory() {
            return Err(Error::ExFAT(exfat::Error::NotFound));
        }
        debug!("Image {} of {} bytes on cluster {}", path, node.data_length(), node.first_cluster());
        let list = extent::extract(&mut filesystem.chain(&node), node.data_length(), partition.offset())?;
        Ok(Some(list))
    }
}

pub struct LocationResolver {
    sources: Vec<Box<dyn LocationSource>>,
}

impl LocationResolver {
    pub fn new(sources: Vec<Box<dyn LocationSource>>) -> Self {
        Self { sources }
    }

    pub fn platform(platform: &Platform, disk: &str) -> Self {
        let table = FirmwareTable::new(platform.acpi_table(crate::source::acpi::FIRMWARE_TABLE_SIGNATURE));
        Self::new(vec![
            Box::new(PhysMemSnapshot::new(DevMem::new(&platform.memory))),
            Box::new(FirmwareTableSnapshot::new(table)),
            Box::new(LiveExFAT::new(platform, disk)),
        ])
    }

    pub fn resolve(&mut self, record: &ParamRecord) -> Result<RegionList> {
        let mut last_error = None;
        for source in self.sources.iter_mut() {
            debug!("Get image location by {}", source.name());
            let list = match source.try_resolve(record) {
                Ok(Some(list)) => list,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to get image location by {}: {}", source.name(), e);
                    last_error = Some(e);
                    continue;
                }
            };
            if !list.has_identity() {
                warn!("Image location by {} corrupted", source.name());
                last_error = Some(Error::Corrupted("image location"));
                continue;
            }
            debug!("{} regions by {}", list.regions().len(), source.name());
            return Ok(list);
        }
        Err(last_error.unwrap_or(Error::LocationNotFound))
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::disk::test::sys_tree;
    use crate::exfat::image;
    use crate::location::{LinearTable, Region};
    use crate::record::test::sample;
    use crate::source::phymem::test::FakeMemory;

    struct Fixed(Result<Option<RegionList>>);

    impl LocationSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn try_resolve(&mut self, _: &ParamRecord) -> Result<Option<RegionList>> {
            match &self.0 {
                Ok(list) => Ok(list.clone()),
                Err(Error::UnsupportedFilesystem(kind)) => Err(Error::UnsupportedFilesystem(*kind)),
                Err(_) => Err(Error::Corrupted("fixed")),
            }
        }
    }

    fn list(disk_start: u64) -> RegionList {
        RegionList::new(vec![Region { image_start: 0, image_count: 4, disk_start }])
    }

    fn foreign() -> RegionList {
        let mut bytes = list(1).to_bytes();
        bytes[0] ^= 0xFF;
        RegionList::parse(&bytes).unwrap()
    }

    #[test]
    fn test_priority() {
        let mut resolver = LocationResolver::new(vec![
            Box::new(Fixed(Ok(None))),
            Box::new(Fixed(Ok(Some(list(100))))),
            Box::new(Fixed(Ok(Some(list(200))))),
        ]);
        assert_eq!(resolver.resolve(&sample()).unwrap(), list(100));
    }

    #[test]
    fn test_corrupted_skipped() {
        let mut resolver = LocationResolver::new(vec![
            Box::new(Fixed(Ok(Some(foreign())))),
            Box::new(Fixed(Err(Error::Corrupted("short")))),
            Box::new(Fixed(Ok(Some(list(200))))),
        ]);
        assert_eq!(resolver.resolve(&sample()).unwrap(), list(200));

        let mut resolver = LocationResolver::new(vec![Box::new(Fixed(Ok(Some(foreign()))))]);
        assert!(matches!(resolver.resolve(&sample()), Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_exhausted() {
        let mut resolver = LocationResolver::new(vec![Box::new(Fixed(Ok(None)))]);
        assert!(matches!(resolver.resolve(&sample()), Err(Error::LocationNotFound)));

        let kind = FilesystemKind::NTFS;
        let mut resolver = LocationResolver::new(vec![
            Box::new(Fixed(Err(Error::UnsupportedFilesystem(kind)))),
            Box::new(Fixed(Ok(None))),
        ]);
        assert!(matches!(resolver.resolve(&sample()), Err(Error::UnsupportedFilesystem(FilesystemKind::NTFS))));
    }

    #[test]
    fn test_physical_memory_snapshot() {
        let bytes = list(300).to_bytes();
        let record = sample().with_snapshot(0x7FF00000, bytes.len() as u32);
        let mut source = PhysMemSnapshot::new(FakeMemory(vec![(0x7FF00000, bytes)]));
        assert_eq!(source.try_resolve(&record).unwrap(), Some(list(300)));
        assert_eq!(source.try_resolve(&sample()).unwrap(), None);

        // Length too short for the header
        let record = sample().with_snapshot(0x7FF00000, 8);
        assert!(matches!(source.try_resolve(&record), Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_unsupported_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Platform::rooted(dir.path());
        let record = ParamRecord::new([0u8; 16], 1 << 30, 1, FilesystemKind::NTFS, "/a.iso", 1);
        let mut source = LiveExFAT::new(&platform, "sdb");
        assert!(matches!(source.try_resolve(&record), Err(Error::UnsupportedFilesystem(FilesystemKind::NTFS))));
    }

    #[test]
    fn test_live_exfat() {
        let dir = tempfile::tempdir().unwrap();
        let record = sample();
        sys_tree(dir.path(), &record, &image::sample());
        let platform = Platform::rooted(dir.path());
        // No snapshot anywhere, derived from the filesystem
        let mut resolver = LocationResolver::platform(&platform, "sdb");
        let list = resolver.resolve(&record).unwrap();
        let expected = [
            Region { image_start: 0, image_count: 3, disk_start: 2048 + 64 },
            Region { image_start: 3, image_count: 2, disk_start: 2048 + 104 },
        ];
        assert_eq!(list.regions(), &expected);

        let partition = Partition::new(&platform, "sdb", record.partition_index());
        let device = partition.device.display().to_string();
        let table = LinearTable { list: &list, device: &device, partition_start: partition.start };
        let expected = format!("0 12 linear {0} 64\n12 8 linear {0} 104\n", device);
        assert_eq!(table.to_string(), expected);
    }

    #[test]
    fn test_live_exfat_contiguous() {
        let dir = tempfile::tempdir().unwrap();
        let record = ParamRecord::new(sample().disk_identity(), 32 << 30, 1, FilesystemKind::ExFAT, "/iso/flat.bin", 0);
        sys_tree(dir.path(), &record, &image::sample());
        let platform = Platform::rooted(dir.path());
        let mut source = LiveExFAT::new(&platform, "sdb");
        let list = source.try_resolve(&record).unwrap().unwrap();
        // Cluster 30 at sector 32 + 28 * 4 of partition
        let expected = [Region { image_start: 0, image_count: 4, disk_start: 2048 + 144 }];
        assert_eq!(list.regions(), &expected);
    }

    #[test]
    fn test_firmware_table_snapshot_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let record = sample();
        sys_tree(dir.path(), &record, &image::sample());
        let platform = Platform::rooted(dir.path());
        let location = list(4096).to_bytes();
        let mut table = vec![0u8; crate::source::acpi::ACPI_HEADER_SIZE];
        table.extend_from_slice(&record.with_snapshot(0, location.len() as u32).as_bytes());
        table.extend_from_slice(&location);
        fs::create_dir_all(&platform.acpi_tables).unwrap();
        fs::write(platform.acpi_table("VTOY"), table).unwrap();

        let mut resolver = LocationResolver::platform(&platform, "sdb");
        assert_eq!(resolver.resolve(&record).unwrap(), list(4096));
    }

    #[test]
    fn test_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let record = ParamRecord::new(sample().disk_identity(), 32 << 30, 1, FilesystemKind::ExFAT, "/missing.iso", 0);
        sys_tree(dir.path(), &record, &image::sample());
        let platform = Platform::rooted(dir.path());
        let mut resolver = LocationResolver::platform(&platform, "sdb");
        assert!(matches!(resolver.resolve(&record), Err(Error::ExFAT(exfat::Error::NotFound))));
    }
}
