use std::error::Error;
use std::sync::Arc;

use clap::Parser;
mod cli;
use gbridge_core::Core;
use gbridge_provider_core::Provider;
use gbridge_provider_impl::AistudioProvider;
use gbridge_provider_impl::client::build_client;
use tracing::info;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("gbridge failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = cli.aistudio_settings()?;
    let fallback_api_key = cli.fallback_api_key();
    info!(
        host = %cli.host,
        port = cli.port,
        base_url = %settings.base_url,
        default_model = %settings.default_model,
        fallback_api_key = fallback_api_key.is_some(),
        proxy = %cli.proxy.as_deref().unwrap_or(""),
        "config loaded"
    );

    let client = build_client(cli.proxy.as_deref())?;
    let provider: Arc<dyn Provider> = Arc::new(AistudioProvider::new(settings, client));
    info!(provider = %provider.name(), "provider ready");

    let core = Core::new(provider, fallback_api_key);
    let app = core.router();

    let bind = cli.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(addr = %bind, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gbridge=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
