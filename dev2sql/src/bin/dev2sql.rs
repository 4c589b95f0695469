use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use devrex_dev2sql::{ExportOptions, export_device};
use devrex_rawdev::Device;
use log::info;

#[derive(Debug, Parser)]
#[command(
    name = "dev2sql",
    about = "Export a raw device model into a relational snapshot."
)]
struct Args {
    device: PathBuf,
    out: PathBuf,
    #[arg(long)]
    skip_route_resources: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    let dev = Device::from_file(&args.device)?;
    info!(
        "loaded {} [{}]: {} tiles, {} site types",
        dev.name,
        dev.family,
        dev.tiles.len(),
        dev.site_kinds.len()
    );
    let opts = ExportOptions {
        skip_route_resources: args.skip_route_resources,
    };
    export_device(&dev, &args.out, &opts)?;
    Ok(())
}
