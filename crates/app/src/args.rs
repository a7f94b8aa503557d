pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "assetfs")]
#[command(about = "Browse, edit and search remote asset projects as a filesystem")]
pub struct Args {
    /// Asset API base URL (defaults to api_url from the config)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the assetfs config directory (defaults to ~/.assetfs)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: crate::Command,
}
