//! Server initialization and routing

use crate::api;
use crate::assertion::{AssertionResolver, AssertionVerifier};
use crate::cache::{CacheBackend, HostCache};
use crate::config::Config;
use crate::middleware::tenant_router;
use crate::repository::{ProfileRepositoryImpl, TenantRepositoryImpl};
use crate::service::{DomainService, TenantResolver};
use crate::state::HasServices;
use crate::vercel::VercelClient;
use anyhow::Result;
use axum::{
    extract::Path,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub cache: CacheBackend,
    pub resolver:
        Arc<TenantResolver<TenantRepositoryImpl, ProfileRepositoryImpl, CacheBackend>>,
    pub domain_service: Arc<DomainService<TenantRepositoryImpl, VercelClient, CacheBackend>>,
    pub assertion_resolver: Arc<AssertionResolver<TenantRepositoryImpl>>,
}

impl HasServices for AppState {
    type TenantRepo = TenantRepositoryImpl;
    type ProfileRepo = ProfileRepositoryImpl;
    type Cache = CacheBackend;
    type Edge = VercelClient;

    fn config(&self) -> &Config {
        &self.config
    }

    fn resolver(&self) -> &TenantResolver<Self::TenantRepo, Self::ProfileRepo, Self::Cache> {
        &self.resolver
    }

    fn domain_service(&self) -> &DomainService<Self::TenantRepo, Self::Edge, Self::Cache> {
        &self.domain_service
    }

    fn assertion_resolver(&self) -> &AssertionResolver<Self::TenantRepo> {
        &self.assertion_resolver
    }

    async fn check_ready(&self) -> (bool, bool) {
        let db_ok = sqlx::query("SELECT 1").execute(&self.db_pool).await.is_ok();
        let cache_ok = self.cache.ping().await.is_ok();
        (db_ok, cache_ok)
    }
}

/// Run the server
pub async fn run(config: Config) -> Result<()> {
    // Create database connection pool
    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    info!("Connected to database");

    let cache = CacheBackend::new(config.redis.as_ref()).await?;
    match cache {
        CacheBackend::Redis(_) => info!("Connected to Redis"),
        CacheBackend::Noop(_) => info!("REDIS_URL not set, hostname cache disabled"),
    }

    // Create repositories
    let tenant_repo = Arc::new(TenantRepositoryImpl::new(db_pool.clone()));
    let profile_repo = Arc::new(ProfileRepositoryImpl::new(db_pool.clone()));

    // Create the edge provider client
    let vercel_client = Arc::new(VercelClient::new(config.vercel.clone())?);

    // Create services
    let cache_arc = Arc::new(cache.clone());
    let resolver = Arc::new(TenantResolver::new(
        tenant_repo.clone(),
        profile_repo,
        cache_arc.clone(),
        config.routing.clone(),
    ));
    let domain_service = Arc::new(DomainService::new(
        tenant_repo.clone(),
        vercel_client,
        cache_arc,
        config.vercel.clone(),
    ));
    let assertion_verifier = AssertionVerifier::new(config.assertion.clone())?;
    let assertion_resolver = Arc::new(AssertionResolver::new(assertion_verifier, tenant_repo));

    let state = AppState {
        config: Arc::new(config.clone()),
        db_pool,
        cache,
        resolver,
        domain_service,
        assertion_resolver,
    };

    let app = build_router(state);

    let http_addr = config.http_addr();
    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Placeholder handler for the internal tenant namespace. The routing
/// middleware rewrites inbound requests to `/t/{tenantId}/...`; the
/// storefront renderer is mounted here in the full deployment.
async fn tenant_root(Path(tenant_id): Path<String>) -> String {
    format!("tenant:{}", tenant_id)
}

async fn tenant_path(Path((tenant_id, rest)): Path<(String, String)>) -> String {
    format!("tenant:{}:/{}", tenant_id, rest)
}

/// Build the HTTP router with generic state type
///
/// This function is generic over the state type, allowing it to work with
/// both production `AppState` and test implementations that implement
/// `HasServices`.
pub fn build_router<S: HasServices>(state: S) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        // Domain lifecycle endpoints
        .route(
            "/api/v1/register-domain",
            post(api::domains::register_domain::<S>),
        )
        .route(
            "/api/v1/check-domain-status",
            get(api::domains::check_domain_status::<S>),
        )
        .route(
            "/api/v1/disconnect-domain",
            post(api::domains::disconnect_domain::<S>),
        )
        // Resolution endpoint
        .route(
            "/api/v1/resolve-domain",
            get(api::resolve::resolve_domain::<S>),
        )
        // Internal tenant namespace
        .route("/t/{tenant_id}", get(tenant_root))
        .route("/t/{tenant_id}/{*rest}", get(tenant_path))
        // Add middleware
        .layer(from_fn_with_state(state.clone(), tenant_router::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
