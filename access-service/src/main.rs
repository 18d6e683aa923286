use access_service::{
    build_router,
    config::ServiceConfig,
    services::{
        AuditService, AuthService, AuthorizationService, ConsentService, CredentialService,
        Database, HttpPlatformClient, PgAuditStore, SessionService, SuspiciousLoginService,
    },
    AppState,
};
use hub_core::middleware::rate_limit::create_ip_rate_limiter;
use hub_core::observability::logging::init_tracing;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), hub_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = ServiceConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting access service"
    );

    // Initialize database connection
    tracing::info!("Initializing database connection");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| {
            hub_core::error::AppError::DatabaseError(anyhow::anyhow!(
                "Failed to connect to PostgreSQL: {}",
                e
            ))
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        hub_core::error::AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e))
    })?;

    let db = Database::new(pool);

    let seeded = db.ensure_system_permissions().await?;
    if seeded > 0 {
        tracing::info!(rows = seeded, "Seeded fixed permission matrix");
    }
    tracing::info!("Database initialized successfully");

    // Platform function client
    let platform: Arc<dyn access_service::services::PlatformFunctions> =
        Arc::new(HttpPlatformClient::new(&config.platform)?);

    // Rate limiters
    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Login and Global IP");

    // Services
    let audit = AuditService::new(Arc::new(PgAuditStore::new(db.clone())));
    let authz = AuthorizationService::new(db.clone(), audit.clone());
    let sessions = SessionService::new(db.clone(), config.security.session_expiry_hours);
    let credentials = CredentialService::new(db.clone(), audit.clone());
    let suspicious = SuspiciousLoginService::new(db.clone(), audit.clone(), platform.clone());
    let auth = AuthService::new(
        db.clone(),
        sessions.clone(),
        credentials.clone(),
        suspicious.clone(),
        audit.clone(),
    );
    let consents = ConsentService::new(db.clone(), audit.clone());

    // Create application state
    let state = AppState {
        config: config.clone(),
        db,
        audit,
        authz,
        sessions,
        credentials,
        auth,
        suspicious,
        consents,
        platform,
        login_rate_limiter,
        ip_rate_limiter,
    };

    // Build application router
    let app = build_router(state).await?;

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    hub_core::axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
