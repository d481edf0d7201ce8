use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use joss_shared::clients::db::create_pool;
use joss_shared::clients::redis::RedisClient;
use joss_shared::clients::{BlobStore, EmailClient, MemoryBlobStore, MinioClient, Notifier, OutboxNotifier};
use joss_shared::middleware::metrics_middleware;
use joss_shared::{SessionKeys, SessionSecret};

pub mod config;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

use config::{AppConfig, BlobBackend, NotifierBackend, StoreBackend};
use services::oauth::GoogleOAuth;
use services::passwords::Passwords;
use services::throttle::EmailThrottle;
use store::{AccountStore, MemoryStore, PgStore, PhotoStore};

/// The outbound collaborators of the service, chosen at startup.
pub struct Backends {
    pub accounts: Arc<dyn AccountStore>,
    pub photos: Arc<dyn PhotoStore>,
    pub notifier: Arc<dyn Notifier>,
    pub blobs: Arc<dyn BlobStore>,
    pub throttle: EmailThrottle,
}

impl Backends {
    /// Connects everything `config` asks for.
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let (accounts, photos): (Arc<dyn AccountStore>, Arc<dyn PhotoStore>) = match config.store_backend {
            StoreBackend::Postgres => {
                let pool = create_pool(&config.database_url, config.db_pool_size, config.store_timeout())?;
                let store = Arc::new(PgStore::new(pool, config.store_timeout()));
                (store.clone(), store)
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory account store, data is lost on restart");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

        let notifier: Arc<dyn Notifier> = match config.notifier_backend {
            NotifierBackend::Resend => Arc::new(EmailClient::new(
                &config.resend_api_key,
                &config.from_email,
                &config.from_name,
                config.downstream_timeout(),
            )?),
            NotifierBackend::Outbox => Arc::new(OutboxNotifier::new()),
        };

        let blobs: Arc<dyn BlobStore> = match config.blob_backend {
            BlobBackend::S3 => Arc::new(
                MinioClient::new(
                    &config.s3_endpoint,
                    &config.s3_access_key,
                    &config.s3_secret_key,
                    &config.s3_bucket,
                    &config.s3_public_url,
                    config.downstream_timeout(),
                )
                .await,
            ),
            BlobBackend::Memory => Arc::new(MemoryBlobStore::new(&config.s3_public_url)),
        };

        let redis = match &config.redis_url {
            Some(url) => Some(RedisClient::connect(url).await?),
            None => None,
        };
        let throttle = EmailThrottle::new(redis, config.email_rate_limit_secs);

        Ok(Self {
            accounts,
            photos,
            notifier,
            blobs,
            throttle,
        })
    }

    /// Everything in-process: memory store, outbox notifier, memory blobs
    /// and no e-mail throttle.
    pub fn in_memory(config: &AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            accounts: store.clone(),
            photos: store,
            notifier: Arc::new(OutboxNotifier::new()),
            blobs: Arc::new(MemoryBlobStore::new(&config.s3_public_url)),
            throttle: EmailThrottle::disabled(),
        }
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub sessions: SessionKeys,
    pub passwords: Passwords,
    pub accounts: Arc<dyn AccountStore>,
    pub photos: Arc<dyn PhotoStore>,
    pub notifier: Arc<dyn Notifier>,
    pub blobs: Arc<dyn BlobStore>,
    pub throttle: EmailThrottle,
    pub google: GoogleOAuth,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: AppConfig, backends: Backends, metrics: Option<PrometheusHandle>) -> anyhow::Result<Self> {
        let sessions = SessionKeys::new(&config.jwt_secret, config.session_ttl_secs);
        let passwords = Passwords::new(config.argon2_memory_kib, config.argon2_iterations)?;
        let google = GoogleOAuth::new(
            &config.google_client_id,
            &config.google_client_secret,
            &config.google_redirect_uri,
            config.downstream_timeout(),
        )?;

        Ok(Self {
            config,
            sessions,
            passwords,
            accounts: backends.accounts,
            photos: backends.photos,
            notifier: backends.notifier,
            blobs: backends.blobs,
            throttle: backends.throttle,
            google,
            metrics,
        })
    }
}

impl SessionSecret for AppState {
    fn session_keys(&self) -> &SessionKeys {
        &self.sessions
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/auth/login", post(routes::login::login))
        .route("/auth/verify-email", get(routes::verify_email::verify_email))
        .route("/auth/resend-verification", post(routes::verify_email::resend_verification))
        .route("/auth/forgot-password", post(routes::forgot_password::forgot_password))
        .route("/auth/reset-password", post(routes::reset_password::reset_password))
        .route("/auth/google", post(routes::oauth::google_oauth))
        .route("/profile", get(routes::profile::get_profile))
        .route(
            "/users",
            post(routes::register::register)
                .get(routes::users::get_user_by_query)
                .put(routes::users::update_user_by_query)
                .delete(routes::users::delete_user_by_query),
        )
        .route(
            "/users/:id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route(
            "/photos",
            post(routes::photos::upload_photo)
                .get(routes::photos::list_photos)
                .layer(upload_limit.clone()),
        )
        .route(
            "/upload/profile-picture",
            post(routes::photos::upload_profile_picture).layer(upload_limit),
        )
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
