use depot_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (_state, router, signals) = depot_api::setup::initialize_app(config.clone()).await?;
    depot_api::setup::jobs::spawn_signal_listener(signals);

    depot_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
