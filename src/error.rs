use std::io;

use crate::exfat;
use crate::record::FilesystemKind;

#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum Error {
    /// Runtime parameters not found
    ParamNotFound,
    /// Corrupted {0}
    Corrupted(&'static str),
    /// No disk matches runtime parameters
    DiskNotFound,
    /// {0} disks match runtime parameters, indistinguishable
    DiskAmbiguous(usize),
    /// Unsupported filesystem {0}
    UnsupportedFilesystem(FilesystemKind),
    /// Image location not found
    LocationNotFound,
    /// IO({0})
    IO(#[from] io::Error),
    /// ExFAT({0})
    ExFAT(#[from] exfat::Error<io::Error>),
}

pub type Result<T> = core::result::Result<T, Error>;
