//! Thin HTTP transport over the seeding core.
//!
//! Handlers validate, delegate, and map errors; no domain logic lives here.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::insights::InsightGenerator;
use crate::models::{Id, UserInfo};
use crate::seed::{SeedError, SeedingOrchestrator};
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SeedingOrchestrator>,
    pub store: Arc<dyn DocumentStore>,
    pub insights: Arc<InsightGenerator>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/seed", post(seed))
        .route("/api/seed/progress", get(seed_progress))
        .route("/api/profile/{user_id}", get(profile))
        .route("/api/insights/{user_id}", get(insights))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the listener is closed.
pub async fn serve(state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "RetroVault API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    user_info: UserInfoBody,
    #[serde(default)]
    force_refresh: bool,
}

/// Wire-side user info; the hosted app sends camelCase.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInfoBody {
    display_name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

impl From<UserInfoBody> for UserInfo {
    fn from(body: UserInfoBody) -> Self {
        UserInfo {
            display_name: body.display_name,
            email: body.email,
            avatar_url: body.avatar_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeedResponse {
    success: bool,
    message: String,
    data_source: String,
    accounts_count: u32,
    transactions_count: u32,
    is_existing_data: bool,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": error.into() })),
    )
        .into_response()
}

async fn seed(State(state): State<AppState>, Json(request): Json<SeedRequest>) -> Response {
    let Some(raw_id) = request.user_id.filter(|id| !id.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "userId is required");
    };

    let user_id = match Id::from_string_checked(raw_id) {
        Ok(id) => id,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };

    let info: UserInfo = request.user_info.into();
    match state
        .orchestrator
        .seed(&user_id, &info, request.force_refresh)
        .await
    {
        Ok(result) => Json(SeedResponse {
            success: true,
            message: if result.is_existing_data {
                "Existing data is fresh".to_string()
            } else {
                format!("Seeded from {}", result.data_source)
            },
            data_source: result.data_source.to_string(),
            accounts_count: result.accounts_count,
            transactions_count: result.transactions_count,
            is_existing_data: result.is_existing_data,
        })
        .into_response(),
        Err(SeedError::Validation(message)) => error_response(StatusCode::BAD_REQUEST, message),
        Err(err) => {
            tracing::error!(error = %err, "Seeding failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressQuery {
    user_id: String,
    #[serde(default)]
    force_refresh: bool,
}

async fn seed_progress(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> Response {
    let user_id = Id::from_string(query.user_id);
    match state.orchestrator.progress(&user_id, query.force_refresh) {
        Some(progress) => Json(json!({
            "success": true,
            "percent": progress.percent,
            "message": progress.message,
        }))
        .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no seeding run in progress"),
    }
}

async fn profile(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    let user_id = Id::from_string(user_id);
    match state.store.get_profile(&user_id).await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "profile not found"),
        Err(err) => {
            tracing::error!(error = %err, "Profile lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

async fn insights(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    let user_id = Id::from_string(user_id);
    match state.store.get_profile(&user_id).await {
        Ok(Some(profile)) => {
            let text = state.insights.narrative(&profile).await;
            Json(json!({ "success": true, "insight": text })).into_response()
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, "profile not found"),
        Err(err) => {
            tracing::error!(error = %err, "Insight lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
