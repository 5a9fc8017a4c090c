use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use peerscope::hub::{HubClient, HubInfoClient};
use peerscope::infrastructure::AppState;
use peerscope::ip_api::IpApiClient;
use peerscope::services::{GeoResolver, HubInfoProber, PeerListIngestor};
use peerscope::{config, db};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peerscope=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    let Some(hub_url) = config.hub_url.clone() else {
        tracing::error!("HUB_URL is not set, nothing to crawl");
        std::process::exit(1);
    };

    // Initialize database
    let db = db::init_db(&config.database_url)
        .await
        .expect("Failed to initialize database");
    let state = AppState::new(db);

    let hub_client =
        HubClient::new(&hub_url, config.http_timeout).expect("Failed to build hub client");
    let geo_client = IpApiClient::new(&config.geo_api_url, config.http_timeout)
        .expect("Failed to build geolocation client");
    let info_client = HubInfoClient::new(config.hub_info_port, config.hub_info_timeout)
        .expect("Failed to build hub info client");

    // Each pipeline is its own task; they only meet in the database
    let ingestor = PeerListIngestor::new(
        state.peer_repo.clone(),
        hub_client,
        config.peer_list_interval,
    );
    tokio::spawn(ingestor.run());

    let resolver = GeoResolver::new(state.peer_repo.clone(), geo_client, config.geo.clone());
    tokio::spawn(resolver.run());

    let prober = HubInfoProber::new(
        state.peer_repo.clone(),
        info_client,
        config.hub_info.clone(),
    );
    tokio::spawn(prober.run());

    tracing::info!("Peerscope running against {}", hub_url);

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutting down..."),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
