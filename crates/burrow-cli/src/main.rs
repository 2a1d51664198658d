//! burrow - manage a self-healing set of folders under a sandbox root.

use anyhow::Result;
use burrow_cli::{logging, run, Args};
use clap::Parser;
use std::io;

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.debug)?;

    let stdout = io::stdout();
    run(&args, &mut stdout.lock())
}
