//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::PeerRepository;
use crate::infrastructure::SeaOrmPeerRepository;

/// State shared by the enrichment pipelines
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    /// Peer repository
    pub peer_repo: Arc<dyn PeerRepository>,
}

impl AppState {
    /// Create a new AppState with all repositories initialized
    pub fn new(db: DatabaseConnection) -> Self {
        let peer_repo = Arc::new(SeaOrmPeerRepository::new(db.clone()));

        Self { db, peer_repo }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
