//! A web service scaffold with axum.

use web_scaffold::{
    app,
    infra::{config, logging},
};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let _guard = logging::init_logging(&config.log)?;
    tracing::debug!("logger init success");

    let running = app::start(config).await?;
    if let Err(e) = running.run().await {
        tracing::error!(fatal = true, "Server shutdown: {}", e);
        return Err(e.into());
    }

    tracing::info!("Server exited");
    Ok(())
}
