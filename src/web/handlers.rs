//! HTTP handlers for the dashboard API

use axum::{
    body::Bytes,
    extract::{Query, State},
    response::Json,
};
use std::collections::HashMap;

use crate::{
    AppState,
    core::protocol::Status,
    web::{
        errors::ApiError,
        gist::Gist,
        types::{ParseRequest, ParseResponse, VersionRequest, VersionResponse},
    },
};

/// Parse failures reported by the service are delivered with a 200; only
/// transport failures become HTTP errors.
#[axum_macros::debug_handler]
pub async fn parse_handler(
    State(app_state): State<AppState>,
    body: Bytes,
) -> Result<Json<ParseResponse>, ApiError> {
    let request = ParseRequest::from_json(&body)?;
    let backend = app_state
        .backends
        .connect(request.server_url.as_deref())
        .await?;

    let response = backend.parse(request.to_backend()).await?;
    if response.status != Status::Ok {
        tracing::info!(
            backend = backend.addr(),
            filename = request.filename.as_deref().unwrap_or_default(),
            status = ?response.status,
            "parsing service could not parse the file"
        );
    }

    Ok(Json(ParseResponse::from_backend(response, &request)?))
}

#[axum_macros::debug_handler]
pub async fn version_handler(
    State(app_state): State<AppState>,
    body: Bytes,
) -> Result<Json<VersionResponse>, ApiError> {
    let request = VersionRequest::from_json(&body)?;
    let backend = app_state
        .backends
        .connect(request.server_url.as_deref())
        .await?;

    let response = backend.version().await?;
    if response.status != Status::Ok {
        return Err(ApiError::Rejected(response.errors.unwrap_or_default()));
    }

    Ok(Json(VersionResponse {
        dashboard: app_state.dashboard_version.clone(),
        server: response.version,
    }))
}

#[axum_macros::debug_handler]
pub async fn gist_handler(
    State(app_state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Gist, ApiError> {
    let path = params
        .get("url")
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::Decode("missing url query parameter".to_string()))?;

    app_state.gists.fetch(path).await
}
