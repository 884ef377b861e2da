use std::path::PathBuf;

use clap::Parser;

mod app;
mod audio;
mod config;
mod error;
mod library;
mod mpris;
mod runtime;
mod session;
mod store;
mod ui;

/// A terminal playlist player with a 10-band equalizer and a spectrum visualizer.
#[derive(Debug, Parser)]
#[command(name = "allegro", version, about)]
struct Cli {
    /// Audio files or directories to add to the playlist.
    paths: Vec<PathBuf>,

    /// Config file to use instead of the default location.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Start with an empty playlist instead of restoring the last one.
    #[arg(long)]
    no_restore: bool,

    /// Print the effective settings as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    runtime::run(runtime::RunOptions {
        paths: cli.paths,
        config: cli.config,
        restore: !cli.no_restore,
        print_config: cli.print_config,
    })
}
