use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Bootstrap the schema (plain SQL, valid for SQLite and PostgreSQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS peer_addresses (
            network TEXT NOT NULL,
            address TEXT NOT NULL,
            last_seen TEXT NOT NULL,
            gossip_address TEXT,
            gossip_family INTEGER,
            gossip_port INTEGER,
            gossip_dns_name TEXT,
            rpc_address TEXT,
            rpc_family INTEGER,
            rpc_port INTEGER,
            rpc_dns_name TEXT,
            count BIGINT,
            hub_version TEXT,
            app_version TEXT,
            peer_timestamp TEXT,
            country TEXT,
            country_code TEXT,
            region TEXT,
            region_name TEXT,
            city TEXT,
            zip TEXT,
            latitude DOUBLE PRECISION,
            longitude DOUBLE PRECISION,
            hosting BOOLEAN,
            org TEXT,
            geo_data_fetched_at TEXT,
            geo_attempted_at TEXT,
            latency BIGINT,
            version TEXT,
            is_syncing BOOLEAN,
            nickname TEXT,
            root_hash TEXT,
            num_messages BIGINT,
            num_fid_events BIGINT,
            num_fname_events BIGINT,
            peer_id TEXT,
            hub_operator_fid BIGINT,
            info_fetched_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (network, address)
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Tables created before attempt tracking; fails harmlessly when present
    let _ = db
        .execute(Statement::from_string(
            db.get_database_backend(),
            "ALTER TABLE peer_addresses ADD COLUMN geo_attempted_at TEXT".to_owned(),
        ))
        .await;

    // Staleness scans filter on these
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "CREATE INDEX IF NOT EXISTS idx_peer_addresses_geo_fetched ON peer_addresses (geo_data_fetched_at)"
            .to_owned(),
    ))
    .await?;
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "CREATE INDEX IF NOT EXISTS idx_peer_addresses_info_fetched ON peer_addresses (info_fetched_at)"
            .to_owned(),
    ))
    .await?;

    Ok(())
}
