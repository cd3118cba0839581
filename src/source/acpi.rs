use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::record::{self, ParamRecord, RECORD_SIZE};
use crate::source::ParamSource;

pub const ACPI_HEADER_SIZE: usize = 36;
pub const FIRMWARE_TABLE_SIGNATURE: &str = "VTOY";
pub const ISCSI_BOOT_TABLE_SIGNATURE: &str = "iBFT";
/// Producer side holds the iBFT in a buffer of this size
const ISCSI_BOOT_TABLE_LIMIT: usize = 1024;

/// Whole table, `None` if the firmware did not install it
fn read_table(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} not exist", path.display());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// ACPI table of the boot stage: header, record, then optionally the image location
pub struct FirmwareTable {
    path: PathBuf,
}

impl FirmwareTable {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Record embedded right after the table header
    fn record(bytes: &[u8]) -> Option<ParamRecord> {
        ParamRecord::parse(bytes.get(ACPI_HEADER_SIZE..)?)
    }

    /// Image location following the embedded record, sized by that record
    pub fn snapshot(&self) -> Result<Option<Vec<u8>>> {
        let bytes = match read_table(&self.path)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let record = match Self::record(&bytes) {
            Some(record) => record,
            None => return Ok(None),
        };
        let length = record.snapshot_length() as usize;
        debug!("Image location in firmware table of {} bytes", length);
        if length == 0 {
            return Ok(None);
        }
        let start = ACPI_HEADER_SIZE + RECORD_SIZE;
        match bytes.get(start..start + length) {
            Some(snapshot) => Ok(Some(snapshot.to_vec())),
            None => {
                warn!("Firmware table of {} bytes truncates image location", bytes.len());
                Ok(Some(bytes.get(start..).unwrap_or_default().to_vec()))
            }
        }
    }
}

impl ParamSource for FirmwareTable {
    fn name(&self) -> &str {
        "ACPI VTOY table"
    }

    fn try_locate(&mut self) -> Result<Option<ParamRecord>> {
        Ok(read_table(&self.path)?.and_then(|bytes| Self::record(&bytes)))
    }
}

/// iSCSI boot firmware table, where legacy BIOS boot leaves the record
pub struct IscsiBootTable {
    path: PathBuf,
}

impl IscsiBootTable {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl ParamSource for IscsiBootTable {
    fn name(&self) -> &str {
        "ACPI iBFT table"
    }

    fn try_locate(&mut self) -> Result<Option<ParamRecord>> {
        let bytes = match read_table(&self.path)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        debug!("iBFT table size {}", bytes.len());
        if bytes.is_empty() || bytes.len() >= ISCSI_BOOT_TABLE_LIMIT {
            return Ok(None);
        }
        Ok(record::scan(&bytes, 1).map(|(offset, record)| {
            debug!("Runtime parameters at iBFT offset {}", offset);
            record
        }))
    }
}
