use anyhow::Result;
use tracing_subscriber::EnvFilter;

use travel_panel::config::PanelConfig;
use travel_panel::web;

#[tokio::main]
async fn main() -> Result<()> {
    let config = PanelConfig::load()?;
    init_tracing(&config);
    web::run(config).await
}

fn init_tracing(config: &PanelConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
