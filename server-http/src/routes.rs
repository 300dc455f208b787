use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use shared::config::Config;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Build and configure the application router
pub fn build_router(state: AppState, config: &Config) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Single-item routes; PUT /item/ is not mapped
        .route(
            "/item/",
            post(handlers::set_item)
                .get(handlers::get_item)
                .delete(handlers::delete_item),
        )
        .route("/items/", get(handlers::get_items))
        .route("/item/add/", post(handlers::add_item))
        .route("/item/compareandswap/", put(handlers::compare_and_swap_item))
        .route("/item/increment/", put(handlers::increment_item))
        .route("/item/decrement/", put(handlers::decrement_item))
        .route("/item/replace/", put(handlers::replace_item))
        .route("/item/touch/", put(handlers::touch_item))
        // Middleware
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
