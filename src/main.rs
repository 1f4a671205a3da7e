use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use release_gateway::api::{ApiResponse, ReleaseService};
use release_gateway::config::{self, GatewayConfig};
use release_gateway::logging;
use release_gateway::release::cache::SqliteStore;
use release_gateway::release::sources::GitHubReleaseSource;

#[derive(Parser)]
#[command(name = "release-gateway")]
#[command(version, about = "Cached release metadata for auto-update clients")]
struct Cli {
    /// Emit log lines as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Highest released version
    Latest,
    /// One release by version, or `latest`
    Version { version: String },
    /// Release notes for every version newer than CURRENT
    Changelog { current: String },
    /// Number of served releases
    Count,
    /// Support status of an installed version
    Status { current: String },
    /// Force an upstream refresh
    Refresh {
        /// Refresh credential, sent as a bearer token
        #[arg(long)]
        token: Option<String>,
    },
    /// Drop the cached snapshot
    Purge,
    /// Store the credential required by `refresh`
    SetRefreshSecret { secret: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    std::fs::create_dir_all(config::data_dir())?;
    let _guard = logging::init(&config::log_path(), cli.json_logs);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command))
}

async fn run(command: Command) -> anyhow::Result<()> {
    let config = GatewayConfig::load()?;
    let store = Arc::new(SqliteStore::open(&config::db_path())?);
    let source = Arc::new(GitHubReleaseSource::from_config(&config.upstream));
    let service = ReleaseService::from_config(store, source, &config);

    let response = match command {
        Command::Latest => service.latest().await,
        Command::Version { version } => service.version(&version).await,
        Command::Changelog { current } => service.changelog(&current).await,
        Command::Count => service.count().await,
        Command::Status { current } => service.status(&current).await,
        Command::Refresh { token } => {
            let header = token.map(|token| format!("Bearer {token}"));
            service.refresh(header.as_deref()).await
        }
        Command::Purge => {
            service.purge().await?;
            return Ok(());
        }
        Command::SetRefreshSecret { secret } => {
            anyhow::ensure!(!secret.is_empty(), "Refresh secret must not be empty");
            service.provision_secret(&secret).await?;
            return Ok(());
        }
    };

    print(&response)
}

fn print(response: &ApiResponse) -> anyhow::Result<()> {
    info!("Responding with status {}", response.status);
    println!("{}", serde_json::to_string_pretty(&response.to_json())?);
    Ok(())
}
