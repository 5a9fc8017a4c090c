use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "peer_addresses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub network: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub address: String,
    pub last_seen: String,

    pub gossip_address: Option<String>,
    pub gossip_family: Option<i32>,
    pub gossip_port: Option<i32>,
    pub gossip_dns_name: Option<String>,
    pub rpc_address: Option<String>,
    pub rpc_family: Option<i32>,
    pub rpc_port: Option<i32>,
    pub rpc_dns_name: Option<String>,
    pub count: Option<i64>,
    pub hub_version: Option<String>,
    pub app_version: Option<String>,
    pub peer_timestamp: Option<String>,

    // Geo data
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub region_name: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hosting: Option<bool>,
    pub org: Option<String>,
    pub geo_data_fetched_at: Option<String>,
    pub geo_attempted_at: Option<String>,

    // Hub info
    pub latency: Option<i64>,
    pub version: Option<String>,
    pub is_syncing: Option<bool>,
    pub nickname: Option<String>,
    pub root_hash: Option<String>,
    pub num_messages: Option<i64>,
    pub num_fid_events: Option<i64>,
    pub num_fname_events: Option<i64>,
    pub peer_id: Option<String>,
    pub hub_operator_fid: Option<i64>,
    pub info_fetched_at: Option<String>,

    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
