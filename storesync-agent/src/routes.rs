use crate::error::AppError;
use crate::helpers::{hash_token, now};
use crate::host::Dispatch;
use crate::validation;
use crate::AppState;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::TypedHeader;
use axum_macros::debug_handler;
use headers::authorization::Bearer;
use headers::Authorization;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use storesync_core::{Host, SyncError, TriageEvent};

#[derive(Deserialize)]
pub(crate) struct JoinRequest {
    player: String,
    #[serde(default)]
    uuid: Option<String>,
    ip: String,
}

#[derive(Deserialize)]
pub(crate) struct TransitionRequest {
    player: String,
}

#[derive(Deserialize)]
pub(crate) struct SyncRequest {
    players: Vec<String>,
}

#[derive(Serialize)]
pub(crate) struct CommandsResponse {
    dispatches: Vec<Dispatch>,
}

#[derive(Serialize)]
pub(crate) struct PackageEntry {
    code: String,
    id: i64,
    name: String,
    price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct PackagesResponse {
    packages: Vec<PackageEntry>,
}

#[derive(Deserialize)]
pub(crate) struct CheckoutRequest {
    player: String,
    package: String,
}

#[derive(Serialize)]
pub(crate) struct CheckoutResponse {
    url: String,
    expires: String,
}

#[derive(Deserialize)]
pub(crate) struct BanRequest {
    player: String,
    #[serde(default)]
    ip: Option<String>,
    reason: String,
}

#[derive(Deserialize)]
pub(crate) struct TriageRequest {
    message: String,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

fn authorize(state: &AppState, auth: &Authorization<Bearer>) -> Result<(), AppError> {
    if hash_token(auth.token()) == state.token_hash {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

#[debug_handler]
pub(crate) async fn join(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(payload): Json<JoinRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;
    validation::validate_player_name(&payload.player)?;
    validation::validate_ip(&payload.ip)?;

    let session = state
        .engine
        .host
        .presence()
        .player_join(&payload.player, payload.uuid, &payload.ip, now())
        .await?;

    // The backend identifies players by uuid where the server has one
    let player_id = session
        .uuid
        .clone()
        .unwrap_or_else(|| session.name.to_string());
    state
        .engine
        .joins
        .on_player_connected(player_id, session.ip)
        .await;

    Ok(StatusCode::OK)
}

pub(crate) async fn leave(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(payload): Json<TransitionRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;
    validation::validate_player_name(&payload.player)?;

    state
        .engine
        .host
        .presence()
        .player_leave(&payload.player)
        .await;

    Ok(StatusCode::OK)
}

pub(crate) async fn sync(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(payload): Json<SyncRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;
    // Validate player list (size and individual names)
    validation::validate_player_list(&payload.players)?;

    state
        .engine
        .host
        .presence()
        .sync_players(&payload.players, now())
        .await?;

    Ok(StatusCode::OK)
}

#[debug_handler]
pub(crate) async fn commands(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;

    let dispatches = state.engine.host.drain().await;
    if !dispatches.is_empty() {
        tracing::debug!(count = dispatches.len(), "handing dispatches to game server");
    }

    Ok(Json(CommandsResponse { dispatches }))
}

pub(crate) async fn packages(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;

    let packages = state
        .engine
        .catalog
        .short_code_listing()
        .await?
        .into_iter()
        .map(|(code, package)| PackageEntry {
            code,
            id: package.id,
            name: package.name,
            price: package.price,
            category: package.category.map(|category| category.name),
        })
        .collect();

    Ok(Json(PackagesResponse { packages }))
}

#[debug_handler]
pub(crate) async fn checkout(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;
    validation::validate_player_name(&payload.player)?;
    validation::validate_package_token(&payload.package)?;

    let Some(session) = state.engine.host.presence().get(&payload.player).await else {
        return Err(SyncError::PlayerOffline(payload.player).into());
    };

    let checkout = state
        .engine
        .storefront
        .checkout(&session, &payload.player, &payload.package)
        .await?;

    Ok(Json(CheckoutResponse {
        url: checkout.url,
        expires: checkout.expires,
    }))
}

pub(crate) async fn ban(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(payload): Json<BanRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;
    validation::validate_player_name(&payload.player)?;
    validation::validate_reason(&payload.reason)?;
    if let Some(ip) = &payload.ip {
        validation::validate_ip(ip)?;
    }

    state
        .engine
        .storefront
        .ban(&payload.player, payload.ip.as_deref(), &payload.reason)
        .await?;

    Ok(StatusCode::OK)
}

pub(crate) async fn lookup(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(player): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;
    validation::validate_player_name(&player)?;

    let user = state.engine.storefront.lookup(&player).await?;
    Ok(Json(user))
}

pub(crate) async fn triage(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(payload): Json<TriageRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;
    validation::validate_triage_message(&payload.message)?;

    let mut event = state
        .engine
        .host
        .fill_triage_parameters(TriageEvent::new(payload.message));
    event.metadata = payload.metadata;
    state.engine.triage.report_manual(event).await;

    Ok(StatusCode::ACCEPTED)
}
