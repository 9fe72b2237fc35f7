// Copyright (c) 2025 knix
// All rights reserved.

use std::fmt::Write as _;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use crate::link::{ByteOrder, Link, LinkConfig, objfile};
use crate::typer::Typer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordSize {
    W32,
    W64,
}

impl WordSize {
    pub const fn bytes(&self) -> u32 {
        match self {
            WordSize::W32 => 4,
            WordSize::W64 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
/// The targets whose layouts the checker and linker know. A flat list rather than
/// a triple, since few combinations are meaningful.
pub enum Target {
    LinuxAmd64,
    #[value(name = "linux-386")]
    Linux386,
    Wasm32,
}

impl Target {
    pub fn word_size(&self) -> WordSize {
        match self {
            Target::LinuxAmd64 => WordSize::W64,
            Target::Linux386 => WordSize::W32,
            Target::Wasm32 => WordSize::W32,
        }
    }

    /// Register width; wasm has 64-bit registers under 32-bit pointers
    pub fn reg_size(&self) -> u32 {
        match self {
            Target::LinuxAmd64 => 8,
            Target::Linux386 => 4,
            Target::Wasm32 => 8,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        match self {
            Target::LinuxAmd64 | Target::Linux386 | Target::Wasm32 => ByteOrder::Little,
        }
    }

    pub fn checker_config(&self, max_errors: usize) -> CheckerConfig {
        let ptr_size = self.word_size().bytes();
        CheckerConfig { ptr_size, reg_size: self.reg_size(), int_size: ptr_size, max_errors }
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig { byte_order: self.byte_order() }
    }
}

/// Machine parameters the checker lays types out with, and its error budget
#[derive(Debug, Clone, Copy)]
pub struct CheckerConfig {
    pub ptr_size: u32,
    pub reg_size: u32,
    pub int_size: u32,
    /// Stop reporting after this many errors; 0 reports everything
    pub max_errors: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig { ptr_size: 8, reg_size: 8, int_size: 8, max_errors: 0 }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Read object file symbol tables into one link context and print it
    Objdump {
        /// Package path that `"".` in symbol names stands for
        #[arg(long, default_value = "main")]
        pkg: String,
        /// Object file blobs
        files: Vec<PathBuf>,
    },
    /// Print the predeclared types with their layout on the target
    Universe,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Target platform
    #[arg(long, value_enum, default_value_t = Target::LinuxAmd64)]
    pub target: Target,

    /// Debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Stop reporting after this many errors (0 = no limit)
    #[arg(long, default_value_t = 10)]
    pub max_errors: usize,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn checker_config(&self) -> CheckerConfig {
        self.target.checker_config(self.max_errors)
    }
}

/// Reads every object file into a fresh link context, one version per file
pub fn load_objects(args: &Args, pkg: &str, files: &[PathBuf]) -> Result<Link> {
    let mut link = Link::new(args.target.link_config());
    for path in files {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let length = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let pn = path.display().to_string();
        objfile::ldobjfile(&mut link, &mut reader, pkg, length, &pn)?;
        info!("read {} ({} bytes), {} symbols so far", pn, length, link.syms.len());
    }
    Ok(link)
}

pub fn objdump(args: &Args, pkg: &str, files: &[PathBuf]) -> Result<String> {
    let link = load_objects(args, pkg, files)?;
    Ok(link.dump())
}

/// One line per predeclared type: name, width and alignment on the target
pub fn universe(args: &Args) -> String {
    let mut typer = Typer::new(args.checker_config(), "main");
    let mut out = String::new();
    for (name, t) in typer.predeclared_types() {
        typer.dowidth(t);
        let (size, align) = (typer.types.size(t), typer.types.alignment(t));
        let _ = writeln!(out, "{:<16} size {:>2} align {}", name, size, align);
    }
    out
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::*;

    #[test]
    fn target_configs() {
        let c = Target::Linux386.checker_config(5);
        assert_eq!((c.ptr_size, c.reg_size, c.int_size, c.max_errors), (4, 4, 4, 5));
        let c = Target::Wasm32.checker_config(0);
        assert_eq!((c.ptr_size, c.reg_size), (4, 8));
        assert_eq!(Target::LinuxAmd64.link_config().byte_order, ByteOrder::Little);
    }

    #[test]
    fn parse_args() -> Result<()> {
        let args = Args::try_parse_from(["gotc", "--target", "linux-386", "objdump", "--pkg", "fmt", "a.o", "b.o"])?;
        assert_eq!(args.target, Target::Linux386);
        assert_eq!(args.max_errors, 10);
        let Command::Objdump { pkg, files } = &args.command else { panic!("expected objdump") };
        assert_eq!(pkg, "fmt");
        assert_eq!(files.len(), 2);

        for (name, target) in [("linux-amd64", Target::LinuxAmd64), ("wasm32", Target::Wasm32)] {
            assert_eq!(Args::try_parse_from(["gotc", "--target", name, "universe"])?.target, target);
        }
        assert!(Args::try_parse_from(["gotc", "--target", "linux386", "universe"]).is_err());
        Ok(())
    }

    #[test]
    fn universe_lists_layouts() -> Result<()> {
        let args = Args::try_parse_from(["gotc", "--target", "linux-386", "universe"])?;
        let out = universe(&args);
        assert!(out.lines().any(|l| l.starts_with("string") && l.contains("size  8")), "{}", out);
        assert!(out.lines().any(|l| l.starts_with("int64") && l.contains("align 4")), "{}", out);
        Ok(())
    }
}
