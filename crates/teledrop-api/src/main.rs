use teledrop_api::setup;
use teledrop_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (storage, services, routes)
    let (state, router) = setup::initialize_app(config.clone()).await?;

    // Start the server
    setup::server::start_server(&config, state, router).await?;

    Ok(())
}
