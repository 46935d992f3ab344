use tacticalrmm_provider::{init_logging, serve, TacticalRmmProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Tactical RMM provider");
    serve(TacticalRmmProvider::new()).await
}
