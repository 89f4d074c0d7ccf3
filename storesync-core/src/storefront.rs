//! Player-facing store actions: checkout links, bans and customer lookups.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::StoreApi;
use crate::catalog::CatalogSync;
use crate::error::{Result, SyncError};
use crate::host::Host;
use crate::models::{BanRequest, CheckoutUrl, UserLookup};
use crate::triage::{TriageReporter, metadata};

pub struct Storefront<A, H> {
  api: Arc<A>,
  host: Arc<H>,
  catalog: Arc<CatalogSync<A, H>>,
  triage: Arc<TriageReporter<A, H>>,
}

impl<A: StoreApi, H: Host> Storefront<A, H> {
  pub fn new(
    api: Arc<A>,
    host: Arc<H>,
    catalog: Arc<CatalogSync<A, H>>,
    triage: Arc<TriageReporter<A, H>>,
  ) -> Self {
    Self {
      api,
      host,
      catalog,
      triage,
    }
  }

  /// Create a checkout link for `token` (short code or package id) and send it
  /// to the player.
  pub async fn checkout(
    &self,
    player: &H::Player,
    player_name: &str,
    token: &str,
  ) -> Result<CheckoutUrl> {
    self.catalog.get_packages().await?;

    let Some(package) = self.catalog.get_package_by_short_code_or_id(token).await else {
      self
        .reply(player, &format!("Package {token} was not found."))
        .await;
      return Err(SyncError::PackageNotFound(token.to_string()));
    };

    match self.api.create_checkout_url(package.id, player_name).await {
      Ok(checkout) => {
        info!(player = player_name, package_id = package.id, "checkout link created");
        self
          .reply(
            player,
            &format!("Complete your purchase of {}: {}", package.name, checkout.url),
          )
          .await;
        Ok(checkout)
      }
      Err(err) => {
        warn!(player = player_name, package_id = package.id, error = %err, "failed to create checkout link");
        self
          .triage
          .report_auto(
            format!("failed to create checkout link: {err}"),
            metadata([
              ("player", player_name.to_string()),
              ("package_id", package.id.to_string()),
            ]),
          )
          .await;
        self
          .reply(player, "Could not create a checkout link, please try again later.")
          .await;
        Err(err.into())
      }
    }
  }

  /// Ban a player on the store.
  pub async fn ban(&self, player_name: &str, ip: Option<&str>, reason: &str) -> Result<()> {
    let ban = BanRequest {
      reason: reason.to_string(),
      ip: ip.map(str::to_string),
      user: player_name.to_string(),
    };

    if let Err(err) = self.api.create_ban(&ban).await {
      warn!(player = player_name, error = %err, "failed to create ban");
      self
        .triage
        .report_auto(
          format!("failed to create ban: {err}"),
          metadata([("player", player_name.to_string())]),
        )
        .await;
      return Err(err.into());
    }

    info!(player = player_name, "player banned on store");
    Ok(())
  }

  /// Customer record for a player id or name.
  pub async fn lookup(&self, user_id: &str) -> Result<UserLookup> {
    Ok(self.api.get_user(user_id).await?)
  }

  async fn reply(&self, player: &H::Player, message: &str) {
    if let Err(err) = self.host.reply_to_player(player, message).await {
      warn!(error = %err, "failed to deliver reply to player");
    }
  }
}
