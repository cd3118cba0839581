use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::record::{self, ParamRecord};
use crate::source::ParamSource;

/// Dump of a parameter-carrying region, scanned at every byte offset
pub struct ParamFile {
    path: PathBuf,
}

impl ParamFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl ParamSource for ParamFile {
    fn name(&self) -> &str {
        "parameter file"
    }

    fn try_locate(&mut self) -> Result<Option<ParamRecord>> {
        let bytes = fs::read(&self.path)?;
        Ok(record::scan(&bytes, 1).map(|(offset, record)| {
            debug!("Runtime parameters at offset {} of {}", offset, self.path.display());
            record
        }))
    }
}
