mod location;
mod params;

use std::path::PathBuf;

use bootimg::disk::{self, SysBlock};
use bootimg::{Locator, Platform};
use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(short, long)]
    quiet: bool,
    #[clap(short, action = clap::ArgAction::Count)]
    verbosity: u8,
    /// Print runtime parameters and image location table
    #[clap(short = 'l', conflicts_with = "location_only")]
    location: bool,
    /// Only print image location table (used to generate dmsetup table)
    #[clap(short = 'L')]
    location_only: bool,
    /// Check whether runtime parameters exist
    #[clap(short, long)]
    check: bool,
    /// Read runtime parameters from a dump file instead of firmware
    #[clap(short, long)]
    file: Option<PathBuf>,
}

fn run(args: &Args) -> Result<(), bootimg::Error> {
    let platform = Platform::default();
    let mut locator = match &args.file {
        Some(path) => Locator::file(path),
        None => Locator::platform(&platform),
    };
    let record = locator.locate()?;
    if args.check {
        return Ok(());
    }

    let disk = disk::resolve(&record, &mut SysBlock::new(&platform))?;
    if !args.location_only {
        params::print(&record, &disk);
    }
    if args.location || args.location_only {
        location::print(&platform, &record, &disk, args.location)?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    let level = match (args.quiet, args.verbosity) {
        (true, _) => log::LevelFilter::Off,
        (_, 0) => log::LevelFilter::Info,
        (_, 1) => log::LevelFilter::Debug,
        (_, _) => log::LevelFilter::Trace,
    };
    log::set_max_level(level);
    env_logger::builder().filter(None, level).target(env_logger::Target::Stderr).init();

    if let Some(error) = run(&args).err() {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}
