use store_server::{Config, Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, logging)
    setup_environment();

    print_banner();
    tracing::info!("Storefront server starting...");

    // 2. Configuration
    let config = Config::from_env();

    // 3. State (storage, collaborators, engine)
    let state = ServerState::initialize(&config);

    // 4. Serve (background tasks start inside run)
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
