//! Store backend transport over HTTPS.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use storesync_core::{
    ApiError, ApiResult, BanRequest, Category, CheckoutUrl, JoinEvent, OfflineCommands,
    OnlineCommands, Package, QueueSummary, StoreApi, StoreInfo, TriageEvent, UserLookup,
};
use tracing::debug;

/// Header carrying the server's secret key.
pub const SECRET_HEADER: &str = "X-Store-Secret";

/// Error payload the backend sends with 4xx responses.
#[derive(Deserialize)]
struct ErrorPayload {
    error_code: i64,
    error_message: String,
}

#[derive(Deserialize)]
struct ListingResponse {
    categories: Vec<Category>,
}

#[derive(Serialize)]
struct DeleteCommandsRequest<'a> {
    ids: &'a [i64],
}

#[derive(Serialize)]
struct CheckoutRequest<'a> {
    package_id: i64,
    username: &'a str,
}

pub struct HttpStoreApi {
    client: Client,
    base_url: String,
    secret_key: String,
    debug_mode: bool,
}

impl HttpStoreApi {
    pub fn new(
        base_url: &str,
        secret_key: impl Into<String>,
        timeout: Duration,
        debug_mode: bool,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("storesync-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            debug_mode,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .header(SECRET_HEADER, &self.secret_key)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header(SECRET_HEADER, &self.secret_key)
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.client
            .delete(self.url(path))
            .header(SECRET_HEADER, &self.secret_key)
    }

    /// Send the request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> ApiResult<String> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let url = response.url().path().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if self.debug_mode {
            debug!(%status, path = %url, %body, "store response");
        }

        if status.is_success() {
            return Ok(body);
        }

        if status.is_client_error() {
            if let Ok(payload) = serde_json::from_str::<ErrorPayload>(&body) {
                return Err(ApiError::Api {
                    code: payload.error_code,
                    message: payload.error_message,
                });
            }
        }

        Err(ApiError::Server {
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Parse {
            message: e.to_string(),
            body,
        })
    }
}

impl StoreApi for HttpStoreApi {
    async fn get_information(&self) -> ApiResult<StoreInfo> {
        self.fetch(self.get("/information")).await
    }

    async fn get_listing(&self) -> ApiResult<Vec<Category>> {
        let listing: ListingResponse = self.fetch(self.get("/listing")).await?;
        Ok(listing.categories)
    }

    async fn get_packages(&self) -> ApiResult<Vec<Package>> {
        self.fetch(self.get("/packages?verbose=true")).await
    }

    async fn get_queue(&self) -> ApiResult<QueueSummary> {
        self.fetch(self.get("/queue")).await
    }

    async fn get_offline_commands(&self) -> ApiResult<OfflineCommands> {
        self.fetch(self.get("/queue/offline-commands")).await
    }

    async fn get_online_commands(&self, player_id: i64) -> ApiResult<OnlineCommands> {
        self.fetch(self.get(&format!("/queue/online-commands/{player_id}")))
            .await
    }

    async fn delete_commands(&self, ids: &[i64]) -> ApiResult<()> {
        self.send(self.delete("/queue").json(&DeleteCommandsRequest { ids }))
            .await?;
        Ok(())
    }

    async fn create_checkout_url(&self, package_id: i64, username: &str) -> ApiResult<CheckoutUrl> {
        self.fetch(self.post("/checkout").json(&CheckoutRequest {
            package_id,
            username,
        }))
        .await
    }

    async fn create_ban(&self, ban: &BanRequest) -> ApiResult<()> {
        self.send(self.post("/bans").json(ban)).await?;
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> ApiResult<UserLookup> {
        self.fetch(self.get(&format!("/user/{user_id}"))).await
    }

    async fn send_join_events(&self, events: &[JoinEvent]) -> ApiResult<()> {
        self.send(self.post("/events").json(events)).await?;
        Ok(())
    }

    async fn post_triage_event(&self, url: &str, event: &TriageEvent) -> ApiResult<()> {
        self.send(self.client.post(url).json(event)).await?;
        Ok(())
    }
}
