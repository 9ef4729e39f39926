use axum::Json;
use axum::extract::State;
use serde::Serialize;
use tunecache_core::LifecycleState;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub cache_version: String,
    pub lifecycle: LifecycleState,
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cache_version: state.worker.config().version.clone(),
        lifecycle: state.worker.lifecycle().state().await,
    })
}
