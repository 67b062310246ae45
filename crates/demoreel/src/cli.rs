use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "demoreel",
    author,
    version,
    about = "Timeline-driven shader demo player",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the demo manifest (TOML).
    #[arg(value_name = "MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Disable audio even when the manifest names a music track.
    #[arg(long)]
    pub no_audio: bool,

    /// Frame rate cap (0 = uncapped; defaults to 60).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Override the window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Request fullscreen presentation.
    #[arg(long)]
    pub fullscreen: bool,

    /// Synchronize presents to the display's vertical blank.
    #[arg(long)]
    pub vsync: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a manifest and compile every effect without playing.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the demo manifest (TOML).
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,
}

pub fn parse() -> Cli {
    Cli::parse()
}
