use anyhow::Result;
use clap::Parser;

use forum_porter::cli::commands::{
    handle_export_command, handle_platforms_command, handle_show_command,
};
use forum_porter::cli::{Cli, Commands};
use forum_porter::platforms::PlatformRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let registry = PlatformRegistry::builtin()?;

    match cli.command {
        Commands::Platforms { json } => handle_platforms_command(&registry, json),
        Commands::Show { platform } => handle_show_command(&registry, &platform),
        Commands::Export(args) => handle_export_command(args, &registry).await,
    }
}
