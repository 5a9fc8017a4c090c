use chrono::{Duration, TimeZone, Utc};
use peerscope::db;
use peerscope::domain::{
    DomainError, Endpoint, Enrichment, GeoData, HubInfo, PeerKey, PeerPatch, PeerRepository,
    PeerSighting,
};
use peerscope::infrastructure::AppState;
use peerscope::models::peer_address::Entity as PeerEntity;
use sea_orm::{EntityTrait, PaginatorTrait};

const MAINNET: &str = "FARCASTER_NETWORK_MAINNET";

// Helper to create a test app state
async fn setup_test_state() -> AppState {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    AppState::new(db)
}

// Helper to build a sighting as the ingestor would
fn sighting(network: &str, address: &str, hub_version: &str, count: i64) -> PeerSighting {
    PeerSighting {
        key: PeerKey::new(network, address),
        seen_at: Utc::now(),
        gossip: Endpoint {
            address: address.to_string(),
            family: 4,
            port: 2282,
            dns_name: String::new(),
        },
        rpc: Endpoint {
            address: address.to_string(),
            family: 4,
            port: 2283,
            dns_name: String::new(),
        },
        count,
        hub_version: hub_version.to_string(),
        app_version: "1.11.3".to_string(),
        peer_timestamp: Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()),
    }
}

fn berlin() -> GeoData {
    GeoData {
        country: "Germany".to_string(),
        country_code: "DE".to_string(),
        region: "BE".to_string(),
        region_name: "Berlin".to_string(),
        city: "Berlin".to_string(),
        zip: "10115".to_string(),
        latitude: 52.52,
        longitude: 13.405,
        hosting: true,
        org: "Hetzner".to_string(),
    }
}

fn hub_info(operator_fid: Option<i64>) -> HubInfo {
    HubInfo {
        version: "1.11.3".to_string(),
        is_syncing: false,
        nickname: "hoyt".to_string(),
        root_hash: "abc123".to_string(),
        num_messages: 1_000,
        num_fid_events: 20,
        num_fname_events: 5,
        peer_id: "12D3KooW".to_string(),
        hub_operator_fid: operator_fid,
        latency_ms: 85,
    }
}

#[tokio::test]
async fn test_upsert_replaces_mutable_fields_without_duplicating() {
    let state = setup_test_state().await;
    let repo = state.peer_repo.clone();
    let key = PeerKey::new(MAINNET, "34.1.2.3");

    repo.upsert_peer(&sighting(MAINNET, "34.1.2.3", "2024.5.1", 10))
        .await
        .expect("First upsert failed");
    let first = repo.find_by_key(&key).await.unwrap().expect("Peer missing");

    let mut second = sighting(MAINNET, "34.1.2.3", "2024.6.0", 3);
    second.rpc.dns_name = "hub.example.com".to_string();
    second.seen_at = first.last_seen + Duration::seconds(60);
    repo.upsert_peer(&second).await.expect("Second upsert failed");

    let rows = PeerEntity::find().count(state.db()).await.unwrap();
    assert_eq!(rows, 1, "Upsert must not create a duplicate row");

    let peer = repo.find_by_key(&key).await.unwrap().unwrap();
    assert_eq!(peer.hub_version.as_deref(), Some("2024.6.0"));
    // Counter resets are stored as reported
    assert_eq!(peer.count, Some(3));
    assert_eq!(peer.rpc.unwrap().dns_name, "hub.example.com");
    assert!(peer.last_seen > first.last_seen);
    assert_eq!(peer.created_at, first.created_at);
}

#[tokio::test]
async fn test_same_address_on_two_networks_is_two_peers() {
    let state = setup_test_state().await;
    let repo = state.peer_repo.clone();

    repo.upsert_peer(&sighting(MAINNET, "34.1.2.3", "2024.5.1", 1))
        .await
        .unwrap();
    repo.upsert_peer(&sighting("FARCASTER_NETWORK_TESTNET", "34.1.2.3", "2024.5.1", 1))
        .await
        .unwrap();

    let rows = PeerEntity::find().count(state.db()).await.unwrap();
    assert_eq!(rows, 2);
}

#[tokio::test]
async fn test_upsert_keeps_enrichment_groups() {
    let state = setup_test_state().await;
    let repo = state.peer_repo.clone();
    let key = PeerKey::new(MAINNET, "34.1.2.3");

    repo.upsert_peer(&sighting(MAINNET, "34.1.2.3", "2024.5.1", 1))
        .await
        .unwrap();
    repo.update_fields(&key, PeerPatch::geo(Utc::now(), Some(berlin())))
        .await
        .unwrap();
    repo.update_fields(&key, PeerPatch::info(Utc::now(), Some(hub_info(Some(7)))))
        .await
        .unwrap();

    repo.upsert_peer(&sighting(MAINNET, "34.1.2.3", "2024.6.0", 2))
        .await
        .unwrap();

    let peer = repo.find_by_key(&key).await.unwrap().unwrap();
    assert_eq!(peer.geo, Some(berlin()));
    assert_eq!(peer.info, Some(hub_info(Some(7))));
    assert!(peer.geo_fetched_at.is_some());
    assert!(peer.info_fetched_at.is_some());
}

#[tokio::test]
async fn test_find_stale_selects_missing_and_expired() {
    let state = setup_test_state().await;
    let repo = state.peer_repo.clone();
    let now = Utc::now();

    for address in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
        repo.upsert_peer(&sighting(MAINNET, address, "2024.5.1", 1))
            .await
            .unwrap();
    }
    // .1 never resolved, .2 resolved two days ago, .3 resolved just now
    repo.update_fields(
        &PeerKey::new(MAINNET, "10.0.0.2"),
        PeerPatch::geo(now - Duration::days(2), Some(berlin())),
    )
    .await
    .unwrap();
    repo.update_fields(
        &PeerKey::new(MAINNET, "10.0.0.3"),
        PeerPatch::geo(now, Some(berlin())),
    )
    .await
    .unwrap();

    let stale = repo
        .find_stale(Enrichment::Geo, now - Duration::days(1), 10)
        .await
        .unwrap();
    let addresses: Vec<_> = stale.iter().map(|p| p.key.address.as_str()).collect();
    assert_eq!(addresses.len(), 2);
    assert!(addresses.contains(&"10.0.0.1"));
    assert!(addresses.contains(&"10.0.0.2"));

    let limited = repo
        .find_stale(Enrichment::Geo, now - Duration::days(1), 1)
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);

    // The info scan is independent of geo stamps
    let info_stale = repo
        .find_stale(Enrichment::Info, now - Duration::hours(1), 10)
        .await
        .unwrap();
    assert_eq!(info_stale.len(), 3);
}

#[tokio::test]
async fn test_reserved_stamp_excludes_peer_until_it_expires() {
    let state = setup_test_state().await;
    let repo = state.peer_repo.clone();
    let key = PeerKey::new(MAINNET, "192.168.1.10");
    let now = Utc::now();

    repo.upsert_peer(&sighting(MAINNET, "192.168.1.10", "2024.5.1", 1))
        .await
        .unwrap();
    repo.update_fields(&key, PeerPatch::geo(now, None))
        .await
        .unwrap();

    let peer = repo.find_by_key(&key).await.unwrap().unwrap();
    assert!(peer.geo_fetched_at.is_some());
    assert_eq!(peer.geo, None);

    let stale = repo
        .find_stale(Enrichment::Geo, now - Duration::days(1), 10)
        .await
        .unwrap();
    assert!(stale.is_empty());

    // Once the threshold has passed the peer is due again
    let stale = repo
        .find_stale(Enrichment::Geo, now + Duration::seconds(1), 10)
        .await
        .unwrap();
    assert_eq!(stale.len(), 1);
}

#[tokio::test]
async fn test_update_unknown_peer_is_not_found() {
    let state = setup_test_state().await;

    let result = state
        .peer_repo
        .update_fields(
            &PeerKey::new(MAINNET, "203.0.113.9"),
            PeerPatch::geo(Utc::now(), None),
        )
        .await;

    assert!(matches!(result, Err(DomainError::NotFound)));
}

#[tokio::test]
async fn test_zero_operator_fid_keeps_previous_value() {
    let state = setup_test_state().await;
    let repo = state.peer_repo.clone();
    let key = PeerKey::new(MAINNET, "34.1.2.3");

    repo.upsert_peer(&sighting(MAINNET, "34.1.2.3", "2024.5.1", 1))
        .await
        .unwrap();

    repo.update_fields(&key, PeerPatch::info(Utc::now(), Some(hub_info(Some(1234)))))
        .await
        .unwrap();
    repo.update_fields(&key, PeerPatch::info(Utc::now(), Some(hub_info(None))))
        .await
        .unwrap();
    let peer = repo.find_by_key(&key).await.unwrap().unwrap();
    assert_eq!(peer.info.unwrap().hub_operator_fid, Some(1234));

    repo.update_fields(&key, PeerPatch::info(Utc::now(), Some(hub_info(Some(99)))))
        .await
        .unwrap();
    let peer = repo.find_by_key(&key).await.unwrap().unwrap();
    assert_eq!(peer.info.unwrap().hub_operator_fid, Some(99));
}

#[tokio::test]
async fn test_failed_probe_stamp_keeps_operational_fields() {
    let state = setup_test_state().await;
    let repo = state.peer_repo.clone();
    let key = PeerKey::new(MAINNET, "34.1.2.3");
    let earlier = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    repo.upsert_peer(&sighting(MAINNET, "34.1.2.3", "2024.5.1", 1))
        .await
        .unwrap();
    repo.update_fields(&key, PeerPatch::info(earlier, Some(hub_info(Some(5)))))
        .await
        .unwrap();
    repo.update_fields(&key, PeerPatch::info(later, None))
        .await
        .unwrap();

    let peer = repo.find_by_key(&key).await.unwrap().unwrap();
    assert_eq!(peer.info_fetched_at, Some(later));
    assert_eq!(peer.info, Some(hub_info(Some(5))));
}

#[tokio::test]
async fn test_concurrent_geo_and_info_updates_do_not_clobber() {
    let state = setup_test_state().await;
    let repo = state.peer_repo.clone();
    let key = PeerKey::new(MAINNET, "34.1.2.3");

    repo.upsert_peer(&sighting(MAINNET, "34.1.2.3", "2024.5.1", 1))
        .await
        .unwrap();

    let geo_repo = repo.clone();
    let geo_key = key.clone();
    let geo = tokio::spawn(async move {
        geo_repo
            .update_fields(&geo_key, PeerPatch::geo(Utc::now(), Some(berlin())))
            .await
    });
    let info_repo = repo.clone();
    let info_key = key.clone();
    let info = tokio::spawn(async move {
        info_repo
            .update_fields(&info_key, PeerPatch::info(Utc::now(), Some(hub_info(Some(3)))))
            .await
    });

    geo.await.unwrap().expect("Geo update failed");
    info.await.unwrap().expect("Info update failed");

    let peer = repo.find_by_key(&key).await.unwrap().unwrap();
    assert_eq!(peer.geo, Some(berlin()));
    assert_eq!(peer.info, Some(hub_info(Some(3))));
}

#[tokio::test]
async fn test_failed_geo_attempt_moves_peer_behind_untried_ones() {
    let state = setup_test_state().await;
    let repo = state.peer_repo.clone();
    let now = Utc::now();

    for address in ["10.0.0.1", "10.0.0.2"] {
        repo.upsert_peer(&sighting(MAINNET, address, "2024.5.1", 1))
            .await
            .unwrap();
    }
    let failed = PeerKey::new(MAINNET, "10.0.0.1");
    repo.update_fields(&failed, PeerPatch::geo_attempt(now))
        .await
        .unwrap();

    let peer = repo.find_by_key(&failed).await.unwrap().unwrap();
    assert_eq!(peer.geo_fetched_at, None);
    assert!(peer.geo_attempted_at.is_some());

    // Still due, but the untried peer now comes first
    let stale = repo
        .find_stale(Enrichment::Geo, now - Duration::days(1), 10)
        .await
        .unwrap();
    let addresses: Vec<_> = stale.iter().map(|p| p.key.address.as_str()).collect();
    assert_eq!(addresses, vec!["10.0.0.2", "10.0.0.1"]);

    let first = repo
        .find_stale(Enrichment::Geo, now - Duration::days(1), 1)
        .await
        .unwrap();
    assert_eq!(first[0].key.address, "10.0.0.2");
}
