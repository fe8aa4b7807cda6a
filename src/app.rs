use crate::config::Config;
use crate::handlers::{account, admin, catalog, library, watch};
use crate::pocketbase::{PocketBaseApi, PocketBaseClient};
use crate::preferences::SettingsStore;
use crate::session::SessionStore;
use crate::upsert::KeyedLocks;
use anyhow::{Context, Result};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn PocketBaseApi>,
    pub sessions: SessionStore,
    pub locks: KeyedLocks,
    pub settings: SettingsStore,
}

impl AppState {
    pub fn new(api: Arc<dyn PocketBaseApi>, settings: SettingsStore) -> Self {
        Self {
            api,
            sessions: SessionStore::new(),
            locks: KeyedLocks::new(),
            settings,
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let api: Arc<dyn PocketBaseApi> =
        Arc::new(PocketBaseClient::new(&config.pocketbase_url, config.http_timeout)?);
    info!("Using backend at {}", config.pocketbase_url);

    let settings = SettingsStore::load(&config.settings_path).await;
    let state = AppState::new(api, settings);
    let app = build_router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/resolve", get(catalog::resolve))
        .route("/home", get(catalog::home))
        .route("/movies", get(catalog::movies))
        .route("/series", get(catalog::series))
        .route("/series/:id/episodes", get(catalog::episodes))
        .route("/genres", get(catalog::genres))
        .route("/search", get(catalog::search))
        .route("/watch/:id", get(watch::watch))
        .route("/watch/:id/episode/:episode_id", get(watch::watch_episode))
        .route("/watch/:id/comments", post(watch::post_comment))
        .route("/videos/:id/ratings", get(watch::ratings))
        .route("/videos/:id/rating", put(watch::rate).delete(watch::unrate))
        .route("/videos/:id/favorite", post(watch::toggle_favorite))
        .route("/auth/login", post(account::login))
        .route("/auth/register", post(account::register))
        .route("/auth/logout", post(account::logout))
        .route("/profile", get(account::profile).patch(account::update_profile))
        .route(
            "/profile/settings",
            get(account::settings).put(account::save_settings),
        )
        .route("/favorites", get(library::favorites))
        .route("/favorites/:favorite_id", delete(library::remove_favorite))
        .route("/history", get(library::history).delete(library::clear_history))
        .route("/admin", get(admin::dashboard))
        .route("/admin/*rest", get(admin::section));

    Router::new()
        .route("/health", get(catalog::health))
        .nest("/api", api)
        .fallback(catalog::not_found)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
