// Copyright (c) 2025 knix
// All rights reserved.

use clap::Parser;
use gotc::compiler;
use gotc::compiler::{Args, Command};
use log::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
    info!("{:?}", args);

    match &args.command {
        Command::Objdump { pkg, files } => match compiler::objdump(&args, pkg, files) {
            Ok(out) => print!("{out}"),
            Err(err) => {
                eprintln!("{err:#}");
                std::process::exit(1);
            }
        },
        Command::Universe => print!("{}", compiler::universe(&args)),
    }
    Ok(())
}
