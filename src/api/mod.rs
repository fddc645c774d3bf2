mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::db::Database;
use crate::models::SiteDefaults;
use crate::resolver::Resolver;
use middleware::{auth_middleware, SecurityConfig};

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub resolver: Resolver,
    pub site: Arc<SiteDefaults>,
}

impl AppState {
    /// State backed entirely by one database: catalog, hints and overrides.
    pub fn new(db: Database, site: SiteDefaults) -> Self {
        let resolver = Resolver::new(Arc::new(db.clone()), Arc::new(db.clone()));
        Self {
            db,
            resolver,
            site: Arc::new(site),
        }
    }
}

/// Router with security settings read from the environment.
pub fn create_router(state: AppState) -> Router {
    create_router_with_security(state, SecurityConfig::from_env())
}

pub fn create_router_with_security(state: AppState, security: SecurityConfig) -> Router {
    let auth = from_fn_with_state(security.clone(), auth_middleware);

    let api = Router::new()
        // Catalog
        .route("/entities", get(handlers::list_entities))
        .route(
            "/entities/{slug}",
            get(handlers::get_entity).merge(
                put(handlers::upsert_entity)
                    .delete(handlers::delete_entity)
                    .route_layer(auth.clone()),
            ),
        )
        // Resolution
        .route("/resolve/{slug}", get(handlers::resolve))
        .route("/resolve/{slug}/commit", post(handlers::commit_resolution))
        .route(
            "/hints/{session}",
            get(handlers::get_hint)
                .put(handlers::put_hint)
                .delete(handlers::delete_hint),
        )
        // Metadata
        .route("/metadata", get(handlers::page_metadata))
        .route(
            "/metadata/overrides",
            get(handlers::list_overrides)
                .merge(put(handlers::replace_overrides).route_layer(auth)),
        )
        // Markdown
        .route("/markdown/headings", post(handlers::extract_headings))
        .route("/markdown/render", post(handlers::render_markdown))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(security.cors_layer())
        .with_state(state)
}
