use core::fmt::{Display, Formatter, Result};

use crate::record::ParamRecord;

/// Human readable runtime parameters of the resolved disk
pub struct Report<'a> {
    pub record: &'a ParamRecord,
    pub disk: &'a str,
}

impl<'a> Display for Report<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "=== runtime parameters ===")?;
        writeln!(f, "disk name : /dev/{}", self.disk)?;
        writeln!(f, "disk size : {}", self.record.disk_size())?;
        writeln!(f, "disk part : {}", self.record.partition_index())?;
        writeln!(f, "filesystem: {}", self.record.filesystem_kind())?;
        writeln!(f, "image size: {}", self.record.image_size())?;
        writeln!(f, "image path: {}", self.record.image_path())
    }
}

#[cfg(test)]
mod test {
    use super::Report;
    use crate::record::test::sample;

    #[test]
    fn test_report() {
        let record = sample();
        let report = Report { record: &record, disk: "sdb" };
        let expected = "=== runtime parameters ===\n\
                        disk name : /dev/sdb\n\
                        disk size : 34359738368\n\
                        disk part : 1\n\
                        filesystem: exfat\n\
                        image size: 8292\n\
                        image path: /iso/test.iso\n";
        assert_eq!(report.to_string(), expected);
    }
}
