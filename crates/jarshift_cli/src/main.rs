// jarshift entry point
use anyhow::Result;
use clap::Parser;
use jarshift_cli::{logging, run, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level);
    run(cli)
}
