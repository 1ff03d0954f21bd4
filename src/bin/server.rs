//! Server binary: serves the directory and authentication operations over TCP.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use auth_rpc::config::RpcConfig;
use auth_rpc::directory::ServiceRegistry;
use auth_rpc::error::Result;
use auth_rpc::protocol::dispatcher::Dispatcher;
use auth_rpc::transport::tcp::start_server;
use auth_rpc::utils::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "auth-rpc-server", about = "User directory and authentication RPC server")]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Listen address, overriding configuration
    #[arg(long, short = 'a')]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = RpcConfig::from_file(path)?;
            config.apply_env()?;
            config
        }
        None => RpcConfig::from_env()?,
    };
    if let Some(address) = cli.address {
        config.server.address = address;
    }
    config.validate_strict()?;

    init_logging(&config.logging)?;
    info!(
        app = %config.logging.app_name,
        address = %config.server.address,
        format = config.transport.format.name(),
        "Starting server"
    );

    let registry = Arc::new(ServiceRegistry::new(&config.auth)?);
    let dispatcher = Arc::new(Dispatcher::for_registry(registry)?);
    info!(operations = ?dispatcher.operations()?, "Operations registered");

    start_server(&config, dispatcher).await
}
