use std::sync::Arc;

use auth::Authenticator;
use auth::PasswordHasher;
use auth_service::config::Config;
use auth_service::domain::user::ports::UserRepository;
use auth_service::domain::user::service::AuthService;
use auth_service::inbound::http::router::create_router;
use auth_service::outbound::repositories::InMemoryUserRepository;
use auth_service::outbound::repositories::PostgresUserRepository;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "auth-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        persistent = config.database.url.is_some(),
        access_token_ttl_hours = config.jwt.access_token_ttl_hours,
        refresh_token_ttl_days = config.jwt.refresh_token_ttl_days,
        hash_cost = config.password.hash_cost,
        "Configuration loaded"
    );

    let authenticator = Arc::new(Authenticator::with_settings(
        config.jwt.secret.as_bytes(),
        PasswordHasher::with_cost(config.password.hash_cost)?,
        config.jwt.lifetimes(),
    ));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    match &config.database.url {
        Some(database_url) => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(database_url)
                .await?;
            tracing::info!(
                max_connections = config.database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            serve(
                http_listener,
                PostgresUserRepository::new(pg_pool),
                authenticator,
            )
            .await
        }
        None => {
            tracing::warn!("No database configured, users are kept in memory");

            serve(http_listener, InMemoryUserRepository::new(), authenticator).await
        }
    }
}

async fn serve<UR: UserRepository>(
    listener: TcpListener,
    repository: UR,
    authenticator: Arc<Authenticator>,
) -> Result<(), anyhow::Error> {
    let auth_service = Arc::new(AuthService::new(
        Arc::new(repository),
        Arc::clone(&authenticator),
    ));

    axum::serve(listener, create_router(auth_service, authenticator)).await?;
    tracing::info!("Server exited successfully");

    Ok(())
}
