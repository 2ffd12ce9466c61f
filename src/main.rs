use axum::serve;
use inventory_gateway::config::AppConfig;
use inventory_gateway::{build_app, build_backend};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Default to Info; RUST_LOG overrides
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Inventory Gateway: hierarchical resource expansion over the backend graph");

    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}, inventory root={}",
        config.server.host, config.server.port, config.backend.inventory_root
    );

    let backend = build_backend(&config)?;
    let app = build_app(backend, &config);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("Inventory gateway running on http://{}", bind_address);
    println!(
        "Processors available at http://{}/redfish/v1/Systems/system/Processors",
        bind_address
    );

    serve(listener, app).await?;

    Ok(())
}
