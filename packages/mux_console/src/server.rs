use axum::{
    Json, Router,
    extract::{ConnectInfo, State},
    http::Extensions,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

pub const DEFAULT_VALUE: &str = "Hello, World!";

/// The response body served at `/`, settable from the console or over HTTP.
#[derive(Clone, Debug)]
pub struct SharedValue(Arc<RwLock<String>>);

impl Default for SharedValue {
    fn default() -> Self {
        Self::new(DEFAULT_VALUE)
    }
}

impl SharedValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Arc::new(RwLock::new(value.into())))
    }

    pub async fn get(&self) -> String {
        self.0.read().await.clone()
    }

    pub async fn set(&self, value: impl Into<String>) {
        *self.0.write().await = value.into();
    }
}

#[derive(Clone, Debug)]
pub struct ServerState {
    pub value: SharedValue,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(get_root))
        .route("/value", get(get_value).put(put_value))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn peer(extensions: &Extensions) -> String {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn get_root(State(state): State<ServerState>, extensions: Extensions) -> String {
    info!(from = %peer(&extensions), "Received request");
    state.value.get().await
}

#[derive(Debug, Serialize, Deserialize)]
struct ValueBody {
    value: String,
}

async fn get_value(State(state): State<ServerState>) -> Json<ValueBody> {
    Json(ValueBody {
        value: state.value.get().await,
    })
}

async fn put_value(
    State(state): State<ServerState>,
    extensions: Extensions,
    Json(body): Json<ValueBody>,
) -> Json<ValueBody> {
    info!(from = %peer(&extensions), "Value updated over HTTP");
    state.value.set(body.value.clone()).await;
    Json(body)
}
