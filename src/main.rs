use std::process::ExitCode;

use clap::Parser;
use rackledger::cli::{self, Cli};

fn main() -> ExitCode {
    cli::run(Cli::parse())
}
