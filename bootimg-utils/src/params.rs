use bootimg::{ParamRecord, Report};

pub fn print(record: &ParamRecord, disk: &str) {
    log::debug!("{:?}", record);
    print!("{}", Report { record, disk });
}
