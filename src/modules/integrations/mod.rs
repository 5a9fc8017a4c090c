// External data sources
// The hub gossip network and the ip-api.com geolocation service

pub mod hub;
pub mod ip_api;
