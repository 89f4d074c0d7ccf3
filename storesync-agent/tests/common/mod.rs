#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use storesync_agent::config::Config;
use storesync_agent::http::SECRET_HEADER;
use storesync_agent::{BridgeHost, Engine, HttpStoreApi, Presence};
use tokio::net::TcpListener;

pub const SECRET: &str = "store-secret";

/// In-process stand-in for the store backend.
#[derive(Default)]
pub struct MockStore {
    /// Canned (status, body) per request path, replacing the normal handler
    overrides: Mutex<HashMap<String, (u16, String)>>,
    pub secrets: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<Vec<i64>>>,
    pub events: Mutex<Vec<Value>>,
    pub checkouts: Mutex<Vec<Value>>,
    pub bans: Mutex<Vec<Value>>,
    pub triage: Mutex<Vec<Value>>,
}

impl MockStore {
    pub fn respond_with(&self, path: &str, status: u16, body: &str) {
        self.overrides
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.to_string()));
    }

    pub fn deleted_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.deleted.lock().unwrap().concat();
        ids.sort();
        ids
    }
}

async fn intercept(State(store): State<Arc<MockStore>>, request: Request, next: Next) -> Response {
    if let Some(secret) = request.headers().get(SECRET_HEADER) {
        store
            .secrets
            .lock()
            .unwrap()
            .push(secret.to_str().unwrap_or_default().to_string());
    }

    let canned = store
        .overrides
        .lock()
        .unwrap()
        .get(request.uri().path())
        .cloned();
    match canned {
        Some((status, body)) => (StatusCode::from_u16(status).unwrap(), body).into_response(),
        None => next.run(request).await,
    }
}

async fn information() -> Json<Value> {
    Json(json!({
        "account": {
            "id": 1,
            "domain": "https://shop.example",
            "name": "Example Shop",
            "currency": { "iso_4217": "EUR", "symbol": "€" },
            "online_mode": true,
            "game_type": "minecraft",
            "log_events": true
        },
        "server": { "id": 7, "name": "survival" }
    }))
}

async fn listing() -> Json<Value> {
    Json(json!({
        "categories": [
            { "id": 1, "name": "Ranks", "order": 1, "packages": [] },
            { "id": 2, "name": "Kits", "order": 2, "packages": [] }
        ]
    }))
}

async fn packages() -> Json<Value> {
    Json(json!([
        { "id": 11, "name": "VIP", "order": 2, "price": "9.99", "category": { "id": 1, "name": "Ranks" } },
        { "id": 12, "name": "Starter Kit", "order": 1, "price": "1.99" }
    ]))
}

async fn queue() -> Json<Value> {
    Json(json!({
        "meta": { "execute_offline": true, "next_check": 60, "more": false },
        "players": [ { "id": 5, "name": "Steve", "uuid": "069a79f4" } ]
    }))
}

async fn offline_commands() -> Json<Value> {
    Json(json!({
        "meta": { "limited": false },
        "commands": [
            {
                "id": 100,
                "command": "say thanks {player}",
                "payment": 900,
                "package": 12,
                "conditions": { "delay": 0, "slots": 0 },
                "player": { "id": 6, "name": "Notch", "uuid": null }
            }
        ]
    }))
}

async fn online_commands(Path(player_id): Path<i64>) -> Json<Value> {
    if player_id != 5 {
        return Json(json!({ "commands": [] }));
    }
    Json(json!({
        "commands": [
            { "id": 200, "command": "give {username} diamond 1", "payment": 901, "package": 11 }
        ]
    }))
}

async fn delete_commands(State(store): State<Arc<MockStore>>, Json(body): Json<Value>) -> StatusCode {
    let ids = body["ids"]
        .as_array()
        .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();
    store.deleted.lock().unwrap().push(ids);
    StatusCode::NO_CONTENT
}

async fn checkout(State(store): State<Arc<MockStore>>, Json(body): Json<Value>) -> Json<Value> {
    store.checkouts.lock().unwrap().push(body.clone());
    Json(json!({
        "url": format!("https://shop.example/checkout/{}", body["package_id"]),
        "expires": "2026-10-18T12:00:00Z"
    }))
}

async fn bans(State(store): State<Arc<MockStore>>, Json(body): Json<Value>) -> Response {
    if body["user"] == "Griefer" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error_code": 422, "error_message": "Player already banned" })),
        )
            .into_response();
    }
    store.bans.lock().unwrap().push(body);
    StatusCode::NO_CONTENT.into_response()
}

async fn user(Path(user_id): Path<String>) -> Response {
    if user_id == "Ghost" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error_code": 404, "error_message": "User not found" })),
        )
            .into_response();
    }
    Json(json!({
        "player": { "id": "069a79f4", "username": user_id },
        "ban_count": 0,
        "chargeback_rate": 0.0,
        "payments": [ { "txn_id": "tbx-1", "price": 9.99 } ]
    }))
    .into_response()
}

async fn events(State(store): State<Arc<MockStore>>, Json(body): Json<Value>) -> StatusCode {
    store.events.lock().unwrap().push(body);
    StatusCode::NO_CONTENT
}

async fn triage(State(store): State<Arc<MockStore>>, Json(body): Json<Value>) -> StatusCode {
    store.triage.lock().unwrap().push(body);
    StatusCode::OK
}

/// Start the mock store on an ephemeral port and return its base URL.
pub async fn spawn_store() -> (String, Arc<MockStore>) {
    let store = Arc::new(MockStore::default());
    let app = Router::new()
        .route("/information", get(information))
        .route("/listing", get(listing))
        .route("/packages", get(packages))
        .route("/queue", get(queue).delete(delete_commands))
        .route("/queue/offline-commands", get(offline_commands))
        .route("/queue/online-commands/{player_id}", get(online_commands))
        .route("/checkout", post(checkout))
        .route("/bans", post(bans))
        .route("/user/{user_id}", get(user))
        .route("/events", post(events))
        .route("/triage", post(triage))
        .layer(middleware::from_fn_with_state(store.clone(), intercept))
        .with_state(store.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), store)
}

pub fn test_config(base_url: &str) -> Config {
    Config {
        store_api_url: base_url.to_string(),
        secret_key: SECRET.to_string(),
        debug_mode: true,
        triage_url: format!("{base_url}/triage"),
        ..Config::default()
    }
}

pub fn store_api(config: &Config) -> HttpStoreApi {
    HttpStoreApi::new(
        &config.store_api_url,
        config.secret_key.clone(),
        config.request_timeout,
        config.debug_mode,
    )
    .unwrap()
}

/// Engine wired to the mock store and a fresh bridge host.
pub fn engine(config: &Config) -> Arc<Engine> {
    let host = BridgeHost::new(Arc::new(Presence::new()), "203.0.113.5");
    Arc::new(Engine::new(
        Arc::new(store_api(config)),
        Arc::new(host),
        &config.sync_settings(),
    ))
}
