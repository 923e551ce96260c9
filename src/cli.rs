// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Most settings live in the config file; the command line only says where
// that file is and how to present the results.
// =============================================================================

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

// This struct represents our entire CLI application
#[derive(Parser, Debug)]
#[command(
    name = "deadlink",
    version,
    about = "Crawls websites and reports broken links",
    long_about = "deadlink crawls every site listed in its config file, checks each URL it can reach \
                  and reports the broken ones. Exit code 1 means broken links were found, \
                  which makes it easy to run from CI. With `cron` set in the config file \
                  deadlink keeps running and checks on that schedule."
)]
pub struct Cli {
    /// Location of the config file
    #[arg(short, long, default_value = "config.yml")]
    pub config: PathBuf,

    /// Log progress to stderr (same as `verbose: true` in the config file)
    #[arg(short, long, env = "VERBOSE")]
    pub verbose: bool,

    /// Check once right away, ignoring the `cron` setting of the config file
    #[arg(long)]
    pub now: bool,

    /// How to print the results on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON, one entry per site
    Json,
    /// Human-readable table of broken links
    Table,
}
