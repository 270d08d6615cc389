use colabri_live::config::Config;
use colabri_live::db::dbsession::DbSession;
use colabri_live::live::{sweeper::spawn_idle_sweeper, MemoryStore, SessionRegistry, StoreProvider};
use colabri_live::routes::create_app;
use colabri_live::state::AppState;
use std::panic;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration before tracing so RUST_LOG from app.env applies
    let loaded = Config::load();
    let log_level = loaded
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("colabri_live=debug,tower_http=debug,axum::rejection=trace,{}", log_level).into()
        }))
        .init();

    info!("Starting server...");

    let config = match loaded {
        Ok(config) => {
            info!("✅ Configuration loaded successfully");
            config
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {}", e);
            warn!("Using default configuration");
            Config::default()
        }
    };
    info!(
        "Service '{}' in {} mode, persist failure policy: {:?}",
        config.service_name, config.environment, config.persist_failure_policy
    );

    // Session storage
    let provider: Arc<dyn StoreProvider> = match &config.db_url {
        Some(db_url) => {
            let db = match DbSession::new(db_url, config.db_max_connections).await {
                Ok(db) => db,
                Err(e) => {
                    error!("Failed to initialize database: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = db.ensure_schema().await {
                error!("Failed to prepare database schema: {}", e);
                std::process::exit(1);
            }
            info!("Database initialized successfully");
            Arc::new(db)
        }
        None => {
            warn!("No database URL configured - sessions are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let registry = Arc::new(SessionRegistry::new());
    match config.session_sweep_interval() {
        Some(every) => {
            spawn_idle_sweeper(registry.clone(), every);
        }
        None => warn!("Idle session sweeping disabled"),
    }

    let state = Arc::new(AppState::new(
        registry,
        provider,
        config.persist_failure_policy,
    ));
    let app = create_app(state, &config);

    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 WebSocket available at ws://{}/live/:id", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
