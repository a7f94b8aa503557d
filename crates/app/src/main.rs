mod args;
mod client;
mod logging;
mod op;
mod ops;
mod state;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Branch, Cat, Cp, Init, Ls, Mkdir, Mv, Projects, Pull, Put, Rm, Search, Stat, Version};
use state::{AppConfig, AppState};

command_enum! {
    (Init, Init),
    (Projects, Projects),
    (Ls, Ls),
    (Stat, Stat),
    (Cat, Cat),
    (Put, Put),
    (Mkdir, Mkdir),
    (Mv, Mv),
    (Cp, Cp),
    (Rm, Rm),
    (Search, Search),
    (Branch, Branch),
    (Pull, Pull),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // An uninitialized directory still logs, with default settings
    let config = AppState::load(args.config_path.clone())
        .map(|state| state.config)
        .unwrap_or_else(|_| AppConfig::default());
    let guards = logging::init_logging(&config.log_level, config.log_dir.as_deref());

    let ctx = op::OpContext::new(args.remote, args.config_path, args.yes);

    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    // guards flush on drop; process::exit would skip that
    drop(guards);
    std::process::exit(code);
}
