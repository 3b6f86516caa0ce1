use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use docgraph_core::RelationshipStore;
use tokio::sync::RwLock;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::auth::auth_middleware;
use crate::handlers::{documents as document_handlers, relationships as relationship_handlers};
use crate::Config;

/// One relationship store per workspace, created on first write.
pub type Workspaces = Arc<RwLock<HashMap<Uuid, RelationshipStore>>>;

#[derive(Clone)]
pub struct AppState {
    pub workspaces: Workspaces,
    pub config: Config,
}

pub fn create_router(config: Config) -> Router {
    let state = AppState {
        workspaces: Arc::new(RwLock::new(HashMap::new())),
        config,
    };

    // Document routes (nested under workspaces)
    let document_routes = Router::new()
        .route(
            "/",
            get(document_handlers::list_documents).post(document_handlers::create_document),
        )
        .route(
            "/:doc_id",
            get(document_handlers::get_document)
                .patch(document_handlers::update_document)
                .delete(document_handlers::delete_document),
        )
        .route(
            "/:doc_id/relationships",
            get(relationship_handlers::get_relationships),
        )
        .route("/:doc_id/link", post(relationship_handlers::add_link))
        .route(
            "/:doc_id/link/:target_id",
            delete(relationship_handlers::remove_link),
        )
        .route(
            "/:doc_id/set-current",
            post(relationship_handlers::set_current_version),
        )
        .route(
            "/:doc_id/move-version",
            post(relationship_handlers::move_version),
        );

    // Protected routes with auth middleware
    let protected_routes = Router::new()
        .nest("/workspaces/:id/documents", document_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
