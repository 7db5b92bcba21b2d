mod burrow;
mod esios;
mod heartbeat;
mod ifttt;
mod run;

use clap::{Parser, Subcommand};

use crate::cli::{burrow::BurrowArgs, run::RunArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: switch the devices at the top of every hour until interrupted.
    #[clap(name = "run")]
    Run(Box<RunArgs>),

    /// Development tools.
    #[clap(name = "burrow")]
    Burrow(Box<BurrowArgs>),
}
