use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "voxscreen-server")]
#[command(about = "voxscreen voice screening backend", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,

    /// Classifier artifact path
    #[arg(short, long, env = "VOXSCREEN_MODEL")]
    pub model: Option<PathBuf>,

    /// Recordings directory
    #[arg(short, long, env = "VOXSCREEN_UPLOADS")]
    pub uploads: Option<PathBuf>,

    /// Listen address
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// ffmpeg binary used for browser recordings
    #[arg(long, env = "VOXSCREEN_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// Base URL used in recording links
    #[arg(long)]
    pub public_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
