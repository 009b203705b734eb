//! Command-line interface for the briefing pipeline.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Collects logistics news from configured sources and builds a daily briefing.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the sources TOML file
    #[arg(short, long, default_value = "sources.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the pipeline once and write the newsletter preview
    Run {
        /// Directory for the rendered newsletter file
        #[arg(short, long, default_value = "out")]
        out_dir: PathBuf,

        /// Email the newsletter to the configured recipients
        #[arg(long)]
        send: bool,

        /// Skip saving sources and articles to the database
        #[arg(long)]
        no_persist: bool,
    },

    /// Serve the latest digest over HTTP
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: SocketAddr,
    },
}
