use crate::config::Config;
use crate::db::Db;
use crate::error::{Result, RecordTreeError};
use crate::hierarchy::{get_hierarchy_data, Node};
use crate::registry::RelationshipRegistry;
use crate::store::SqliteStore;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Serves hierarchies over HTTP for the diagram UI
pub struct HierarchyServer {
    state: AppState,
    allowed_origins: Vec<String>,
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    db: Db,
    registry: Arc<RelationshipRegistry>,
    default_max_depth: i64,
}

/// Query string of `GET /hierarchy`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HierarchyQuery {
    #[serde(default)]
    record_id: String,
    #[serde(default)]
    root_type: String,
    /// Parsed by the handler so malformed values get the JSON error body
    max_depth: Option<String>,
}

impl HierarchyServer {
    pub fn new(db: Db, registry: RelationshipRegistry, config: &Config) -> Self {
        Self {
            state: AppState {
                db,
                registry: Arc::new(registry),
                default_max_depth: config.default_max_depth(),
            },
            allowed_origins: config.http_server.allowed_origins.clone(),
        }
    }

    /// Run the HTTP server
    pub async fn run(&self, port: u16) -> Result<()> {
        let app = self.router();

        let addr = format!("127.0.0.1:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RecordTreeError::Http(format!("Failed to bind to {}: {}", addr, e)))?;

        log::info!("Hierarchy endpoint: http://{}/hierarchy", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| RecordTreeError::Http(format!("HTTP server error: {}", e)))?;

        Ok(())
    }

    /// Create the axum router
    pub fn router(&self) -> Router {
        let cors = if self.allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/hierarchy", get(handle_hierarchy))
            .route("/health", get(handle_health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(self.state.clone())
    }
}

async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "recordtree",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}

async fn handle_hierarchy(
    State(state): State<AppState>,
    Query(query): Query<HierarchyQuery>,
) -> Response {
    let max_depth = match parse_max_depth(query.max_depth.as_deref(), state.default_max_depth) {
        Ok(depth) => depth,
        Err(e) => return error_response(e),
    };
    let registry = Arc::clone(&state.registry);
    let HierarchyQuery { record_id, root_type, .. } = query;

    let result: Result<Node> = state
        .db
        .with_connection(move |conn| {
            let store = SqliteStore::new(conn);
            get_hierarchy_data(&store, &registry, &record_id, &root_type, max_depth)
        })
        .await;

    match result {
        Ok(node) => (StatusCode::OK, Json(node)).into_response(),
        Err(e) => error_response(e),
    }
}

fn parse_max_depth(raw: Option<&str>, default: i64) -> Result<i64> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse::<i64>().map_err(|_| {
            RecordTreeError::InvalidInput(format!("maxDepth must be an integer, got {:?}", value))
        }),
    }
}

fn error_response(err: RecordTreeError) -> Response {
    let status = match &err {
        RecordTreeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RecordTreeError::RecordNotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if err.is_caller_error() {
        log::debug!("Rejected hierarchy request: {}", err);
    } else {
        log::error!("Hierarchy request failed: {}", err);
    }

    (
        status,
        Json(serde_json::json!({ "error": err.user_message() })),
    )
        .into_response()
}
