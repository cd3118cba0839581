use bootimg::disk::Partition;
use bootimg::{Error, LinearTable, LocationResolver, ParamRecord, Platform};

/// Print image location as device-mapper linear table over its partition
pub fn print(platform: &Platform, record: &ParamRecord, disk: &str, header: bool) -> Result<(), Error> {
    let list = LocationResolver::platform(platform, disk).resolve(record)?;
    let partition = Partition::new(platform, disk, record.partition_index());
    if header {
        println!("=== image location ===");
    }
    let device = partition.device.display().to_string();
    print!("{}", LinearTable { list: &list, device: &device, partition_start: partition.start });
    Ok(())
}
