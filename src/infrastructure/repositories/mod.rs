//! Repository implementations using SeaORM

pub mod peer_repository;

pub use peer_repository::SeaOrmPeerRepository;
