use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use memmap2::MmapOptions;

use crate::error::Result;
use crate::record::{self, ParamRecord};
use crate::source::ParamSource;

/// Low memory window where legacy boot leaves the record
pub const SCAN_START: u64 = 0x80000;
pub const SCAN_WINDOW: usize = 0x20000;
pub const SCAN_STRIDE: usize = 16;

/// Read-only access to physical memory
pub trait PhysicalMemory {
    fn read(&mut self, address: u64, length: usize) -> Result<Vec<u8>>;
}

/// Physical memory through the memory device, mapped read-only per read
pub struct DevMem {
    path: PathBuf,
}

impl DevMem {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl PhysicalMemory for DevMem {
    fn read(&mut self, address: u64, length: usize) -> Result<Vec<u8>> {
        trace!("Read {} bytes of physical memory at 0x{:x}", length, address);
        let file = File::open(&self.path)?;
        let metadata = file.metadata()?;
        // Mapping beyond end of a regular file faults on access
        if metadata.is_file() && address + length as u64 > metadata.len() {
            let message = format!("0x{:x}+{} beyond end of {}", address, length, self.path.display());
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, message).into());
        }
        let mapping = unsafe { MmapOptions::new().offset(address).len(length).map(&file)? };
        Ok(mapping.to_vec())
    }
}

/// Scan the low memory window at 16 bytes stride
pub struct MemoryScan<M> {
    memory: M,
}

impl<M: PhysicalMemory> MemoryScan<M> {
    pub fn new(memory: M) -> Self {
        Self { memory }
    }
}

impl<M: PhysicalMemory> ParamSource for MemoryScan<M> {
    fn name(&self) -> &str {
        "physical memory"
    }

    fn try_locate(&mut self) -> Result<Option<ParamRecord>> {
        let window = self.memory.read(SCAN_START, SCAN_WINDOW)?;
        Ok(record::scan(&window, SCAN_STRIDE).map(|(offset, record)| {
            debug!("Runtime parameters at physical memory 0x{:08x}", SCAN_START + offset as u64);
            record
        }))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::fs;

    use super::*;
    use crate::record::test::sample;

    /// Sparse physical memory, zero outside of the placed chunks
    #[derive(Default)]
    pub(crate) struct FakeMemory(pub Vec<(u64, Vec<u8>)>);

    impl PhysicalMemory for FakeMemory {
        fn read(&mut self, address: u64, length: usize) -> Result<Vec<u8>> {
            let mut bytes = vec![0u8; length];
            for (start, chunk) in self.0.iter() {
                for (i, &byte) in chunk.iter().enumerate() {
                    let at = start + i as u64;
                    if at >= address && at < address + length as u64 {
                        bytes[(at - address) as usize] = byte;
                    }
                }
            }
            Ok(bytes)
        }
    }

    #[test]
    fn test_memory_scan() {
        let memory = FakeMemory(vec![(SCAN_START + 0x1230, sample().as_bytes().to_vec())]);
        let mut source = MemoryScan::new(memory);
        assert_eq!(source.try_locate().unwrap(), Some(sample()));

        // Off stride
        let memory = FakeMemory(vec![(SCAN_START + 0x1238, sample().as_bytes().to_vec())]);
        assert_eq!(MemoryScan::new(memory).try_locate().unwrap(), None);

        // Outside of window
        let memory = FakeMemory(vec![(SCAN_START - 0x1000, sample().as_bytes().to_vec())]);
        assert_eq!(MemoryScan::new(memory).try_locate().unwrap(), None);
    }

    #[test]
    fn test_dev_mem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mem");
        let mut bytes = vec![0u8; 0x3000];
        bytes[0x2000..0x2004].copy_from_slice(b"ABCD");
        fs::write(&path, &bytes).unwrap();
        let mut memory = DevMem::new(&path);
        assert_eq!(memory.read(0x2000, 4).unwrap(), b"ABCD");
        // not page aligned
        assert_eq!(memory.read(0x2001, 3).unwrap(), b"BCD");
        assert!(memory.read(0x2ffe, 4).is_err());
        assert!(DevMem::new(dir.path().join("missing")).read(0, 4).is_err());
    }
}
