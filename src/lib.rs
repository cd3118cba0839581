#![doc = include_str!("../README.md")]

#[macro_use]
extern crate hex_literal;
#[macro_use]
extern crate log;

pub mod disk;
mod endian;
pub mod error;
pub mod exfat;
pub mod extent;
pub mod io;
pub mod location;
pub mod platform;
pub mod record;
pub mod report;
pub mod resolver;
pub mod source;
pub mod types;

pub use error::{Error, Result};
pub use location::{LinearTable, RegionList};
pub use platform::Platform;
pub use record::ParamRecord;
pub use report::Report;
pub use resolver::LocationResolver;
pub use source::Locator;
