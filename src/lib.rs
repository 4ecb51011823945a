pub mod canon;
pub mod cli;
pub mod columns;
pub mod config;
pub mod data;
pub mod frame;
pub mod io_utils;
pub mod lookup;
pub mod mapping;
pub mod merge;
pub mod normalize;
pub mod report;
pub mod source;
pub mod table;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("runqc", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Merge(args) => merge::execute(&args),
        Commands::Qc(args) => validate::execute(&args),
        Commands::Columns(args) => columns::execute(&args),
    }
}
