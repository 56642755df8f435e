//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Extension},
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use twilio::{TwilioOptions, TwilioService};

use crate::config::Config;
use crate::domains::capture::MAX_IMAGE_BYTES;
use crate::domains::handoff::HandoffSettings;
use crate::domains::otp::OtpPolicy;
use crate::domains::verification::VerificationOrchestrator;
use crate::kernel::{
    BaseOutcomeStore, HttpVerificationOracle, InMemoryKeyValueStore, InMemoryOutcomeStore,
    LocalBlobStore, PostgresOutcomeStore, ServerDeps, SweeperHandle, SystemClock, TwilioAdapter,
};
use crate::server::middleware::{extract_client_ip, RATE_LIMIT_BURST, RATE_LIMIT_PER_SECOND};
use crate::server::routes::{
    create_handoff_handler, entry_handler, health_handler, latest_verification_handler,
    resolve_handoff_handler, send_otp_handler, verify_documents_handler, verify_otp_handler,
};

/// How often expired one-time codes are swept from memory
const KV_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Three images plus form fields
const DOCUMENT_BODY_LIMIT: usize = 3 * MAX_IMAGE_BYTES + 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: Arc<ServerDeps>,
    pub orchestrator: Arc<VerificationOrchestrator>,
    /// "postgres" or "memory"
    pub outcome_backend: &'static str,
}

impl AxumAppState {
    pub fn new(deps: ServerDeps, outcome_backend: &'static str) -> Self {
        Self {
            orchestrator: Arc::new(VerificationOrchestrator::new(deps.clone())),
            deps: Arc::new(deps),
            outcome_backend,
        }
    }
}

/// Everything the binary needs to keep alive while serving
pub struct App {
    pub router: Router,
    pub state: AxumAppState,
    /// Stops the in-memory code sweeper on shutdown
    pub sweeper: SweeperHandle,
}

/// Routes and per-route limits, without the connection-level layers.
///
/// Tests drive this directly; `build_app` wraps it with client IP
/// extraction and rate limiting, which need a real socket.
pub fn build_router(state: AxumAppState, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/api/otp/send", post(send_otp_handler))
        .route("/api/otp/verify", post(verify_otp_handler))
        .route("/api/verification/entry", get(entry_handler))
        .route("/api/handoff", post(create_handoff_handler))
        .route("/api/handoff/resolve", get(resolve_handoff_handler))
        .route(
            "/api/documents/verify",
            post(verify_documents_handler).layer(DefaultBodyLimit::max(DOCUMENT_BODY_LIMIT)),
        )
        .route("/api/users/:user_id/verification", get(latest_verification_handler));

    api.route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // CORS configuration - allow any origin when none configured (development)
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

/// Wire production dependencies from configuration and build the full app.
pub async fn build_app(config: &Config) -> Result<App> {
    let twilio = Arc::new(TwilioService::new(TwilioOptions {
        account_sid: config.twilio_account_sid.clone(),
        auth_token: config.twilio_auth_token.clone(),
        from: config.twilio_from_number.clone(),
    }));

    let oracle_timeout = Duration::from_secs(config.oracle_timeout_secs);
    let oracle = HttpVerificationOracle::new(
        &config.oracle_url,
        config.oracle_api_key.clone(),
        oracle_timeout,
    )
    .context("Failed to create verification oracle client")?;

    let (outcome_store, outcome_backend): (Arc<dyn BaseOutcomeStore>, &'static str) =
        match &config.database_url {
            Some(database_url) => {
                info!("Connecting to database...");
                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(database_url)
                    .await
                    .context("Failed to connect to database")?;

                info!("Running database migrations...");
                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .context("Failed to run migrations")?;
                (
                    Arc::new(PostgresOutcomeStore::new(pool)) as Arc<dyn BaseOutcomeStore>,
                    "postgres",
                )
            }
            None => {
                warn!("DATABASE_URL not set, verification outcomes are kept in memory only");
                (
                    Arc::new(InMemoryOutcomeStore::new()) as Arc<dyn BaseOutcomeStore>,
                    "memory",
                )
            }
        };

    let clock = Arc::new(SystemClock);
    let kv_store = InMemoryKeyValueStore::new(clock.clone());
    let sweeper = kv_store.spawn_sweeper(KV_SWEEP_INTERVAL);

    let deps = ServerDeps::new(
        Arc::new(kv_store),
        Arc::new(TwilioAdapter::new(twilio)),
        Arc::new(LocalBlobStore::new(
            config.blob_dir.clone(),
            config.blob_public_base_url.clone(),
        )),
        Arc::new(oracle),
        outcome_store,
        clock,
        OtpPolicy::default(),
        HandoffSettings {
            public_base_url: config.public_base_url.clone(),
            mobile_path: config.mobile_verify_path.clone(),
        },
        oracle_timeout,
    );
    let state = AxumAppState::new(deps, outcome_backend);

    // Rate limiting configuration
    // 10 requests per second per IP with a burst of 20
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(RATE_LIMIT_PER_SECOND)
            .burst_size(RATE_LIMIT_BURST)
            .use_headers() // Extract IP from X-Forwarded-For header
            .finish()
            .ok_or_else(|| anyhow!("Invalid rate limiter configuration"))?,
    );
    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config,
    };

    // Middleware layers (applied in reverse order - last added runs first)
    let router = build_router(state.clone(), &config.allowed_origins)
        .layer(rate_limit_layer)
        .layer(middleware::from_fn(extract_client_ip));

    Ok(App {
        router,
        state,
        sweeper,
    })
}
