use super::AppState;
use crate::types::ServiceStatus;
use axum::{Json, extract::State};

pub async fn status(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(ServiceStatus {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        files: state.index.stats(),
    })
}
