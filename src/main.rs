use std::sync::Arc;

use anyhow::Context;

use sentiment_webhook::aws::AwsCredentials;
use sentiment_webhook::config::AppConfig;
use sentiment_webhook::server::{build_handler, webhook_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let credentials =
        Arc::new(AwsCredentials::from_env().context("failed to load AWS credentials")?);

    let handler = Arc::new(
        build_handler(&config, credentials).context("failed to build webhook handler")?,
    );

    eprintln!("sentiment-webhook v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Region: {}", config.region);
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);
    eprintln!(
        "   Paraphrase: {}",
        if config.paraphrase_enabled {
            config.paraphrase_model_id.as_str()
        } else {
            "disabled"
        }
    );

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Webhook server started");

    axum::serve(listener, webhook_routes(handler))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("webhook server exited unexpectedly")?;

    Ok(())
}
