use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use thttp_chat::{
    cli::{Cli, Command},
    client,
    config::ServerConfig,
    server::Server,
};

fn init_tracing() {
    use std::io::IsTerminal;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let ansi = std::io::stdout().is_terminal();
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(ansi)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Server(args) => {
            let config = ServerConfig::from(args);
            let server = Server::bind(config.clone()).await?;
            let addr = server.local_addr()?;
            info!("server listening on {}", addr);
            info!(max_thread = config.max_thread, bufsize = config.bufsize, "worker pool ready");
            if let Err(err) = server.run_until_ctrl_c().await {
                warn!("server exited with error: {err:?}");
                return Err(err);
            }
        }
        Command::Client(args) => client::run(args).await?,
    }

    Ok(())
}
