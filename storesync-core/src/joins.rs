//! Buffers player connections and ships them to the backend in batches.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::StoreApi;
use crate::host::Host;
use crate::models::JoinEvent;
use crate::triage::{TriageReporter, metadata};

/// Queue length above which a connection triggers an immediate flush.
pub const JOIN_FLUSH_THRESHOLD: usize = 10;

/// Most events held while the backend is unreachable. Newer ones are dropped.
pub const JOIN_QUEUE_CAPACITY: usize = 1_000;

pub struct JoinBatcher<A, H> {
  api: Arc<A>,
  triage: Arc<TriageReporter<A, H>>,
  queue: Mutex<Vec<JoinEvent>>,
  sending: Mutex<()>,
}

impl<A: StoreApi, H: Host> JoinBatcher<A, H> {
  pub fn new(api: Arc<A>, triage: Arc<TriageReporter<A, H>>) -> Self {
    Self {
      api,
      triage,
      queue: Mutex::new(Vec::new()),
      sending: Mutex::new(()),
    }
  }

  /// Record a connection; flushes once more than [`JOIN_FLUSH_THRESHOLD`]
  /// events are waiting and no batch is already in flight.
  pub async fn on_player_connected(&self, player_id: impl Into<String>, ip: impl Into<String>) {
    let pending = {
      let mut queue = self.queue.lock().await;
      if queue.len() >= JOIN_QUEUE_CAPACITY {
        warn!(pending = queue.len(), "join queue is full, dropping event");
        return;
      }
      queue.push(JoinEvent::server_join(player_id, ip, unix_now()));
      queue.len()
    };

    if pending > JOIN_FLUSH_THRESHOLD {
      match self.sending.try_lock() {
        Ok(_sending) => {
          self.send_queued().await;
        }
        Err(_) => debug!(pending, "join batch already in flight"),
      }
    }
  }

  /// Send every queued event in one request. Returns how many were accepted.
  ///
  /// On failure the queue is kept for the next attempt, so the backend may
  /// see an event twice.
  pub async fn process_join_queue(&self) -> usize {
    let _sending = self.sending.lock().await;
    self.send_queued().await
  }

  /// Caller holds `sending`.
  async fn send_queued(&self) -> usize {
    let batch = self.queue.lock().await.clone();
    if batch.is_empty() {
      return 0;
    }

    match self.api.send_join_events(&batch).await {
      Ok(()) => {
        let mut queue = self.queue.lock().await;
        // Only what was sent; connections recorded meanwhile stay queued
        let sent = batch.len();
        queue.drain(..sent);
        debug!(count = sent, "join events sent");
        sent
      }
      Err(err) => {
        warn!(error = %err, pending = batch.len(), "failed to send join events");
        self
          .triage
          .report_auto(
            format!("failed to send join events: {err}"),
            metadata([
              ("pending", batch.len().to_string()),
              ("body", err.body().unwrap_or_default().to_string()),
            ]),
          )
          .await;
        0
      }
    }
  }

  pub async fn pending(&self) -> usize {
    self.queue.lock().await.len()
  }
}

fn unix_now() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|elapsed| elapsed.as_secs() as i64)
    .unwrap_or_default()
}
