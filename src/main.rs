//! Provider binary entry point. Spawned by Hemmer, never run directly.

use hemmer_provider_azure::{init_logging, serve, AzureProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting Azure provider"
    );

    serve(AzureProvider::new()).await
}
