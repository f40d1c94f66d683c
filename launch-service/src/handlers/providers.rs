use crate::dtos::{ProviderInfo, ProvidersResponse};
use crate::startup::AppState;
use axum::{extract::State, Json};

/// Built-in providers and whether each has a credential right now.
pub async fn list_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    let providers = state
        .dispatcher
        .provider_status()
        .into_iter()
        .map(|(id, configured)| ProviderInfo { id, configured })
        .collect();

    Json(ProvidersResponse { providers })
}
