use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use nimbus::file::SqlFileDirectory;
use nimbus::share::{spawn_expiry_sweeper, AccessGrantStore, LinkIssuer, ShareService};
use nimbus::web::{AppState, WebServer};
use nimbus::{Config, Database, FileStorage, JwtIdentityProvider};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = nimbus::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        nimbus::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("Nimbus file sharing service");

    if let Err(e) = run(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> nimbus::Result<()> {
    let db = Database::open(&config.database.path).await?;
    info!("Database opened at {}", config.database.path);

    let storage = FileStorage::new(&config.files.storage_path)?;
    info!("File storage initialized at: {}", config.files.storage_path);

    let identity = Arc::new(JwtIdentityProvider::new(
        db.pool().clone(),
        &config.auth.jwt_secret,
        config.auth.token_expiry_secs,
    ));
    let store = AccessGrantStore::new(
        db.pool().clone(),
        Arc::new(SqlFileDirectory::new(db.pool().clone())),
        identity.clone(),
    )
    .with_issuer(LinkIssuer::from_config(&config.sharing));

    if config.sharing.sweep_interval_secs > 0 {
        spawn_expiry_sweeper(
            store.clone(),
            Duration::from_secs(config.sharing.sweep_interval_secs),
        );
    }

    let state = AppState::new(ShareService::new(store, storage), identity);
    WebServer::new(&config.server, state)?.run().await
}
