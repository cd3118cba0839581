use std::fs;
use std::path::PathBuf;

use crate::error::Result;
use crate::platform::Platform;
use crate::record::{ParamRecord, RECORD_SIZE};
use crate::source::ParamSource;

/// Attributes preceding variable data in efivarfs
const EFIVARFS_ATTRIBUTE_SIZE: usize = 4;

/// EFI variable set by the boot stage, through efivarfs or the legacy sysfs interface
pub struct EfiVariable {
    efivarfs: PathBuf,
    sysfs: PathBuf,
}

impl EfiVariable {
    pub fn new(platform: &Platform) -> Self {
        Self { efivarfs: platform.efivarfs_variable(), sysfs: platform.sysfs_variable() }
    }

    /// Only the first existing interface is used
    fn path(&self) -> Option<(&PathBuf, usize)> {
        if self.efivarfs.exists() {
            return Some((&self.efivarfs, EFIVARFS_ATTRIBUTE_SIZE));
        }
        debug!("{} not exist", self.efivarfs.display());
        if self.sysfs.exists() {
            return Some((&self.sysfs, 0));
        }
        debug!("{} not exist", self.sysfs.display());
        None
    }
}

impl ParamSource for EfiVariable {
    fn name(&self) -> &str {
        "EFI variable"
    }

    fn try_locate(&mut self) -> Result<Option<ParamRecord>> {
        let (path, skip) = match self.path() {
            Some(path) => path,
            None => return Ok(None),
        };
        let bytes = fs::read(path)?;
        match bytes.get(skip..skip + RECORD_SIZE) {
            Some(data) => Ok(ParamRecord::parse(data)),
            None => {
                debug!("Read {} bytes from {}", bytes.len().saturating_sub(skip), path.display());
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::EfiVariable;
    use crate::platform::Platform;
    use crate::record::test::sample;
    use crate::source::ParamSource;

    #[test]
    fn test_efivarfs() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Platform::rooted(dir.path());
        let mut source = EfiVariable::new(&platform);
        assert_eq!(source.try_locate().unwrap(), None);

        let path = platform.efivarfs_variable();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut bytes = vec![0x07, 0, 0, 0];
        bytes.extend_from_slice(&sample().as_bytes());
        fs::write(&path, &bytes).unwrap();
        assert_eq!(source.try_locate().unwrap(), Some(sample()));

        // Attribute prefix is not part of the record
        fs::write(&path, sample().as_bytes()).unwrap();
        assert_eq!(source.try_locate().unwrap(), None);
    }

    #[test]
    fn test_legacy_sysfs() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Platform::rooted(dir.path());
        let path = platform.sysfs_variable();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, sample().as_bytes()).unwrap();
        let mut source = EfiVariable::new(&platform);
        assert_eq!(source.try_locate().unwrap(), Some(sample()));

        fs::write(&path, &sample().as_bytes()[..511]).unwrap();
        assert_eq!(source.try_locate().unwrap(), None);
    }
}
