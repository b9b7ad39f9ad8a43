use anyhow::Context;
use tracing::info;

use league_bracket::{config, logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load_config().context("load configuration")?;
    let _guard = logging::init_tracing(&config.logging).context("initialise logging")?;
    info!("league bracket service starting");
    config.log_warnings();

    let state = server::ServerState::new(config.bracket);
    server::serve(&config.server.bind_addr, state)
        .await
        .with_context(|| format!("serve on {}", config.server.bind_addr))?;
    info!("league bracket service stopped");
    Ok(())
}
