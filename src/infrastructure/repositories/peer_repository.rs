//! SeaORM implementation of PeerRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{OnConflict, Order};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};

use crate::domain::{
    DomainError, Endpoint, Enrichment, GeoData, HubInfo, Peer, PeerKey, PeerPatch,
    PeerRepository, PeerSighting,
};
use crate::models::peer_address::{ActiveModel, Column, Entity as PeerEntity, Model};
use crate::utils::time::{format_timestamp, parse_timestamp};

/// SeaORM-based implementation of PeerRepository
pub struct SeaOrmPeerRepository {
    db: DatabaseConnection,
}

impl SeaOrmPeerRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PeerRepository for SeaOrmPeerRepository {
    async fn upsert_peer(&self, sighting: &PeerSighting) -> Result<(), DomainError> {
        let now = format_timestamp(Utc::now());

        let peer = ActiveModel {
            network: Set(sighting.key.network.clone()),
            address: Set(sighting.key.address.clone()),
            last_seen: Set(format_timestamp(sighting.seen_at)),
            gossip_address: Set(Some(sighting.gossip.address.clone())),
            gossip_family: Set(Some(sighting.gossip.family)),
            gossip_port: Set(Some(sighting.gossip.port)),
            gossip_dns_name: Set(Some(sighting.gossip.dns_name.clone())),
            rpc_address: Set(Some(sighting.rpc.address.clone())),
            rpc_family: Set(Some(sighting.rpc.family)),
            rpc_port: Set(Some(sighting.rpc.port)),
            rpc_dns_name: Set(Some(sighting.rpc.dns_name.clone())),
            count: Set(Some(sighting.count)),
            hub_version: Set(Some(sighting.hub_version.clone())),
            app_version: Set(Some(sighting.app_version.clone())),
            peer_timestamp: Set(sighting.peer_timestamp.map(format_timestamp)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        // created_at and both enrichment groups survive a re-sighting
        PeerEntity::insert(peer)
            .on_conflict(
                OnConflict::columns([Column::Network, Column::Address])
                    .update_columns([
                        Column::LastSeen,
                        Column::GossipAddress,
                        Column::GossipFamily,
                        Column::GossipPort,
                        Column::GossipDnsName,
                        Column::RpcAddress,
                        Column::RpcFamily,
                        Column::RpcPort,
                        Column::RpcDnsName,
                        Column::PeerTimestamp,
                        Column::HubVersion,
                        Column::AppVersion,
                        Column::Count,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    async fn find_stale(
        &self,
        enrichment: Enrichment,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Peer>, DomainError> {
        // Failed geo lookups leave the fetch stamp empty, so rotation
        // follows the attempt stamp instead. Info attempts always stamp.
        let (fetched_at, attempted_at) = match enrichment {
            Enrichment::Geo => (Column::GeoDataFetchedAt, Column::GeoAttemptedAt),
            Enrichment::Info => (Column::InfoFetchedAt, Column::InfoFetchedAt),
        };

        // Never-attempted rows first on every backend
        let peers = PeerEntity::find()
            .filter(
                Condition::any()
                    .add(fetched_at.is_null())
                    .add(fetched_at.lt(format_timestamp(cutoff))),
            )
            .order_by(attempted_at.is_not_null(), Order::Asc)
            .order_by_asc(attempted_at)
            .order_by_asc(Column::Network)
            .order_by_asc(Column::Address)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(peers.into_iter().map(Peer::from).collect())
    }

    async fn update_fields(&self, key: &PeerKey, patch: PeerPatch) -> Result<(), DomainError> {
        let mut peer = ActiveModel {
            updated_at: Set(format_timestamp(Utc::now())),
            ..Default::default()
        };

        if let Some(attempted_at) = patch.geo_attempt {
            peer.geo_attempted_at = Set(Some(format_timestamp(attempted_at)));
        }

        if let Some(stamp) = patch.geo {
            let fetched_at = format_timestamp(stamp.fetched_at);
            peer.geo_data_fetched_at = Set(Some(fetched_at.clone()));
            peer.geo_attempted_at = Set(Some(fetched_at));
            if let Some(geo) = stamp.data {
                peer.country = Set(Some(geo.country));
                peer.country_code = Set(Some(geo.country_code));
                peer.region = Set(Some(geo.region));
                peer.region_name = Set(Some(geo.region_name));
                peer.city = Set(Some(geo.city));
                peer.zip = Set(Some(geo.zip));
                peer.latitude = Set(Some(geo.latitude));
                peer.longitude = Set(Some(geo.longitude));
                peer.hosting = Set(Some(geo.hosting));
                peer.org = Set(Some(geo.org));
            }
        }

        if let Some(stamp) = patch.info {
            peer.info_fetched_at = Set(Some(format_timestamp(stamp.fetched_at)));
            if let Some(info) = stamp.info {
                peer.version = Set(Some(info.version));
                peer.is_syncing = Set(Some(info.is_syncing));
                peer.nickname = Set(Some(info.nickname));
                peer.root_hash = Set(Some(info.root_hash));
                peer.num_messages = Set(Some(info.num_messages));
                peer.num_fid_events = Set(Some(info.num_fid_events));
                peer.num_fname_events = Set(Some(info.num_fname_events));
                peer.peer_id = Set(Some(info.peer_id));
                peer.latency = Set(Some(info.latency_ms));
                if let Some(fid) = info.hub_operator_fid {
                    peer.hub_operator_fid = Set(Some(fid));
                }
            }
        }

        let result = PeerEntity::update_many()
            .set(peer)
            .filter(Column::Network.eq(key.network.as_str()))
            .filter(Column::Address.eq(key.address.as_str()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound);
        }

        Ok(())
    }

    async fn find_by_key(&self, key: &PeerKey) -> Result<Option<Peer>, DomainError> {
        let peer = PeerEntity::find_by_id((key.network.clone(), key.address.clone()))
            .one(&self.db)
            .await?;

        Ok(peer.map(Peer::from))
    }
}

impl From<Model> for Peer {
    fn from(m: Model) -> Self {
        let gossip = m.gossip_address.map(|address| Endpoint {
            address,
            family: m.gossip_family.unwrap_or_default(),
            port: m.gossip_port.unwrap_or_default(),
            dns_name: m.gossip_dns_name.unwrap_or_default(),
        });
        let rpc = m.rpc_address.map(|address| Endpoint {
            address,
            family: m.rpc_family.unwrap_or_default(),
            port: m.rpc_port.unwrap_or_default(),
            dns_name: m.rpc_dns_name.unwrap_or_default(),
        });

        // Coordinates are always written with the rest of the geo group
        let geo = match (m.latitude, m.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoData {
                country: m.country.unwrap_or_default(),
                country_code: m.country_code.unwrap_or_default(),
                region: m.region.unwrap_or_default(),
                region_name: m.region_name.unwrap_or_default(),
                city: m.city.unwrap_or_default(),
                zip: m.zip.unwrap_or_default(),
                latitude,
                longitude,
                hosting: m.hosting.unwrap_or_default(),
                org: m.org.unwrap_or_default(),
            }),
            _ => None,
        };

        let info = m.version.map(|version| HubInfo {
            version,
            is_syncing: m.is_syncing.unwrap_or_default(),
            nickname: m.nickname.unwrap_or_default(),
            root_hash: m.root_hash.unwrap_or_default(),
            num_messages: m.num_messages.unwrap_or_default(),
            num_fid_events: m.num_fid_events.unwrap_or_default(),
            num_fname_events: m.num_fname_events.unwrap_or_default(),
            peer_id: m.peer_id.unwrap_or_default(),
            hub_operator_fid: m.hub_operator_fid,
            latency_ms: m.latency.unwrap_or_default(),
        });

        Self {
            key: PeerKey::new(m.network, m.address),
            last_seen: parse_timestamp(&m.last_seen).unwrap_or_default(),
            gossip,
            rpc,
            count: m.count,
            hub_version: m.hub_version,
            app_version: m.app_version,
            peer_timestamp: m.peer_timestamp.as_deref().and_then(parse_timestamp),
            geo,
            geo_fetched_at: m.geo_data_fetched_at.as_deref().and_then(parse_timestamp),
            geo_attempted_at: m.geo_attempted_at.as_deref().and_then(parse_timestamp),
            info,
            info_fetched_at: m.info_fetched_at.as_deref().and_then(parse_timestamp),
            created_at: parse_timestamp(&m.created_at).unwrap_or_default(),
            updated_at: parse_timestamp(&m.updated_at).unwrap_or_default(),
        }
    }
}
