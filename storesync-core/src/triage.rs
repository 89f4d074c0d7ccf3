//! Best-effort diagnostic reporting.
//!
//! Nothing in here returns an error: a triage event that cannot be delivered
//! is logged and dropped.

use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::SyncSettings;
use crate::api::StoreApi;
use crate::cache::{INFORMATION, TtlCache};
use crate::error::error_trace;
use crate::host::Host;
use crate::models::{StoreInfo, TriageEvent};

pub type Metadata = BTreeMap<String, String>;

/// Builds a [`Metadata`] map from key/value pairs.
pub fn metadata<const N: usize>(pairs: [(&str, String); N]) -> Metadata {
  pairs
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

pub struct TriageReporter<A, H> {
  api: Arc<A>,
  host: Arc<H>,
  cache: Arc<TtlCache>,
  enabled: bool,
  url: String,
}

impl<A: StoreApi, H: Host> TriageReporter<A, H> {
  pub fn new(api: Arc<A>, host: Arc<H>, cache: Arc<TtlCache>, settings: &SyncSettings) -> Self {
    Self {
      api,
      host,
      cache,
      enabled: settings.auto_reporting_enabled,
      url: settings.triage_url.clone(),
    }
  }

  /// Whether events are transmitted at all.
  pub fn is_enabled(&self) -> bool {
    self.enabled && !self.url.is_empty()
  }

  /// Report an internally detected problem.
  pub async fn report_auto(&self, message: impl Into<String>, metadata: Metadata) {
    let mut event = TriageEvent::new(message);
    event.metadata = metadata;
    let event = self.host.fill_triage_parameters(event);
    self.send(event).await;
  }

  /// Report an internal fault with its source chain as the trace.
  pub async fn report_error(&self, err: &(dyn Error + Send + Sync + 'static), metadata: Metadata) {
    let mut event = TriageEvent::new(err.to_string());
    event.trace = error_trace(err);
    event.metadata = metadata;
    let event = self.host.fill_triage_parameters(event);
    self.send(event).await;
  }

  /// Forward an issue detected by the host. The host has already filled in
  /// its own parameters.
  pub async fn report_manual(&self, event: TriageEvent) {
    self.send(event).await;
  }

  async fn send(&self, mut event: TriageEvent) {
    if !self.is_enabled() {
      debug!(message = %event.error_message, "auto reporting disabled, triage event dropped");
      return;
    }

    let (store_name, store_url) = self.store_identity().await;
    event.store_name = store_name;
    event.store_url = store_url;

    match self.api.post_triage_event(&self.url, &event).await {
      Ok(()) => debug!(message = %event.error_message, "triage event sent"),
      Err(err) => warn!(error = %err, "failed to send triage event"),
    }
  }

  async fn store_identity(&self) -> (String, String) {
    match self.cache.get::<StoreInfo>(INFORMATION).await {
      Ok(Some(info)) => (info.account.name.clone(), info.account.domain.clone()),
      _ => (String::new(), String::new()),
    }
  }
}
