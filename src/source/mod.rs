//! Sources of the runtime parameter record, tried in order.

pub mod acpi;
pub mod efivar;
pub mod file;
pub mod phymem;

use std::path::Path;

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::record::ParamRecord;
pub use acpi::{FirmwareTable, IscsiBootTable};
pub use efivar::EfiVariable;
pub use file::ParamFile;
pub use phymem::{DevMem, MemoryScan, PhysicalMemory};

pub trait ParamSource {
    fn name(&self) -> &str;
    /// `None` when the source exists but carries no valid record
    fn try_locate(&mut self) -> Result<Option<ParamRecord>>;
}

pub struct Locator {
    sources: Vec<Box<dyn ParamSource>>,
}

impl Locator {
    pub fn new(sources: Vec<Box<dyn ParamSource>>) -> Self {
        Self { sources }
    }

    /// Firmware table, EFI variable, low memory then iBFT
    pub fn platform(platform: &Platform) -> Self {
        Self::new(vec![
            Box::new(FirmwareTable::new(platform.acpi_table(acpi::FIRMWARE_TABLE_SIGNATURE))),
            Box::new(EfiVariable::new(platform)),
            Box::new(MemoryScan::new(DevMem::new(&platform.memory))),
            Box::new(IscsiBootTable::new(platform.acpi_table(acpi::ISCSI_BOOT_TABLE_SIGNATURE))),
        ])
    }

    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        Self::new(vec![Box::new(ParamFile::new(path))])
    }

    pub fn locate(&mut self) -> Result<ParamRecord> {
        for source in self.sources.iter_mut() {
            debug!("Locate runtime parameters from {}", source.name());
            match source.try_locate() {
                Ok(Some(record)) => {
                    debug!("Runtime parameters found in {}", source.name());
                    return Ok(record);
                }
                Ok(None) => debug!("No runtime parameters in {}", source.name()),
                Err(e) => warn!("Failed to read {}: {}", source.name(), e),
            }
        }
        Err(Error::ParamNotFound)
    }
}
