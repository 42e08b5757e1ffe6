use clap::Parser;
use tracing_subscriber::EnvFilter;

use doujindl::api;
use doujindl::cli::{Cli, Commands};
use doujindl::config::Config;
use doujindl::fetch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doujindl=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => api::run(args.address).await?,
        Commands::Fetch(args) => {
            let config = Config::load()?;
            let saved = fetch::run_album(&config, &args.album_id).await?;
            println!("{}", saved.display());
        }
    }

    Ok(())
}
