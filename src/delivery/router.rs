use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use http::{header, HeaderValue, Method, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::catalog::Catalog;
use crate::control::views::ViewCounter;
use crate::core::auth::AuthProvider;
use crate::core::config::{AppConfig, DeliveryConfig};
use crate::storage::ContentStore;

use super::middleware::RequestIdLayer;
use super::response::error_json;
use super::{account, admin, handlers};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Application state shared across all handlers.
///
/// Generic over the content backend: `FsContentStore` in production,
/// `InMemoryContentStore` in router tests.
pub struct AppState<S: ContentStore> {
    pub store: Arc<S>,
    pub catalog: Arc<Catalog>,
    pub auth: Arc<AuthProvider>,
    pub views: ViewCounter,
    pub config: Arc<AppConfig>,
    pub start_time: Instant,
    /// Prometheus metrics handle for rendering the /metrics endpoint.
    pub metrics_handle: PrometheusHandle,
}

// Manual impl: `S` itself need not be Clone behind the Arc.
impl<S: ContentStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            catalog: Arc::clone(&self.catalog),
            auth: Arc::clone(&self.auth),
            views: self.views.clone(),
            config: Arc::clone(&self.config),
            start_time: self.start_time,
            metrics_handle: self.metrics_handle.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the full Axum router.
///
/// **Public:**
/// - `GET /videos`, `/videos/featured`, `/videos/trending`,
///   `/videos/by-genre/{genre}`, `/videos/by-category/{category}`,
///   `/videos/{id}`
/// - `GET /videos/{id}/stream` (optional viewer, entitlement-gated)
/// - `GET /search`, `/search/autocomplete`
/// - `GET /ads/for-video/{video_id}`
/// - `GET /healthz`, `/readyz`, `/metrics`
///
/// **Viewer:** likes, my list, preferences, pay-per-view, watch history.
///
/// **Admin:** video, ad and viewer account management.
pub fn build_router<S: ContentStore>(state: AppState<S>) -> Router {
    let cors = cors_layer(&state.config.delivery);
    let body_limit = DefaultBodyLimit::max(state.config.security.max_json_body_bytes);

    Router::new()
        // Catalog
        .route(
            "/videos",
            get(handlers::list_videos::<S>).post(admin::create_video::<S>),
        )
        .route("/videos/featured", get(handlers::featured_videos::<S>))
        .route("/videos/trending", get(handlers::trending_videos::<S>))
        .route("/videos/by-genre/{genre}", get(handlers::videos_by_genre::<S>))
        .route(
            "/videos/by-category/{category}",
            get(handlers::videos_by_category::<S>),
        )
        .route(
            "/videos/{id}",
            get(handlers::get_video::<S>)
                .put(admin::update_video::<S>)
                .delete(admin::delete_video::<S>),
        )
        .route("/videos/{id}/stream", get(handlers::stream_video::<S>))
        .route("/videos/{id}/publish", patch(admin::toggle_publish::<S>))
        .route("/videos/{id}/like", post(account::like_video::<S>))
        .route("/videos/{id}/add-to-list", post(account::add_to_list::<S>))
        .route(
            "/videos/{id}/remove-from-list",
            delete(account::remove_from_list::<S>),
        )
        // Viewers
        .route("/users/my-list", get(account::my_list::<S>))
        .route("/users/preferences", put(account::update_preferences::<S>))
        .route("/users", get(admin::list_users::<S>))
        .route(
            "/users/{id}",
            get(admin::get_user::<S>)
                .put(admin::update_user::<S>)
                .delete(admin::delete_user::<S>),
        )
        // Search
        .route("/search", get(handlers::search_videos::<S>))
        .route("/search/autocomplete", get(handlers::autocomplete::<S>))
        // Pay-per-view
        .route("/ppv/purchases", get(account::list_purchases::<S>))
        .route("/ppv/{video_id}/purchase", post(account::purchase_ppv::<S>))
        .route("/ppv/{video_id}/access", get(account::check_ppv_access::<S>))
        // Ads
        .route(
            "/ads",
            get(admin::list_ads::<S>).post(admin::create_ad::<S>),
        )
        .route(
            "/ads/{id}",
            put(admin::update_ad::<S>).delete(admin::delete_ad::<S>),
        )
        .route("/ads/for-video/{video_id}", get(handlers::ad_for_video::<S>))
        // Watch history
        .route(
            "/watch-history",
            get(account::get_history::<S>)
                .post(account::record_progress::<S>)
                .delete(account::clear_history::<S>),
        )
        .route(
            "/watch-history/continue-watching",
            get(account::continue_watching::<S>),
        )
        .route(
            "/watch-history/{video_id}",
            put(account::update_progress::<S>).delete(account::remove_history_entry::<S>),
        )
        // Health endpoints
        .route("/healthz", get(handlers::healthz::<S>))
        .route("/readyz", get(handlers::readyz::<S>))
        .route("/metrics", get(handlers::metrics_handler::<S>))
        .fallback(|| async { error_json(StatusCode::NOT_FOUND, "not_found", "Route not found") })
        .layer(cors)
        .layer(body_limit)
        .layer(RequestIdLayer)
        .with_state(state)
}

fn cors_layer(config: &DeliveryConfig) -> CorsLayer {
    let wildcard = config.cors_allowed_origins.is_empty()
        || config.cors_allowed_origins.iter().any(|o| o == "*");
    let origin = if wildcard {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::RANGE, header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
        ])
        .max_age(Duration::from_secs(86400))
}
