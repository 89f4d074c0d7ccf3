//! Acknowledges executed commands so the backend drops them from its queue.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::StoreApi;
use crate::host::Host;
use crate::triage::{TriageReporter, metadata};

/// Pending ids at which a backlog warning is logged.
pub const EXECUTED_BACKLOG_WARNING: usize = 1_000;

/// Ids of commands executed locally but not yet deleted remotely.
#[derive(Debug, Default)]
pub struct ExecutedCommands {
  ids: Mutex<Vec<i64>>,
}

impl ExecutedCommands {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record an executed id. Ids already pending are not duplicated.
  pub async fn push(&self, id: i64) {
    let mut ids = self.ids.lock().await;
    if ids.contains(&id) {
      return;
    }
    ids.push(id);
    if ids.len() == EXECUTED_BACKLOG_WARNING {
      warn!(
        pending = ids.len(),
        "executed commands are piling up, is the store backend reachable?"
      );
    }
  }

  /// Whether `id` ran locally and still awaits deletion.
  pub async fn contains(&self, id: i64) -> bool {
    self.ids.lock().await.contains(&id)
  }

  pub async fn snapshot(&self) -> Vec<i64> {
    self.ids.lock().await.clone()
  }

  /// Forget ids the backend has acknowledged.
  pub async fn acknowledge(&self, acknowledged: &[i64]) {
    self.ids.lock().await.retain(|id| !acknowledged.contains(id));
  }

  pub async fn len(&self) -> usize {
    self.ids.lock().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.ids.lock().await.is_empty()
  }
}

pub struct Flusher<A, H> {
  api: Arc<A>,
  executed: Arc<ExecutedCommands>,
  triage: Arc<TriageReporter<A, H>>,
}

impl<A: StoreApi, H: Host> Flusher<A, H> {
  pub fn new(
    api: Arc<A>,
    executed: Arc<ExecutedCommands>,
    triage: Arc<TriageReporter<A, H>>,
  ) -> Self {
    Self {
      api,
      executed,
      triage,
    }
  }

  /// Delete every pending id in one request. Returns how many were deleted.
  ///
  /// A successful response counts for the whole batch. On failure the ids stay
  /// pending and are sent again next time.
  pub async fn flush_executed_commands(&self) -> usize {
    let ids = self.executed.snapshot().await;
    if ids.is_empty() {
      return 0;
    }

    match self.api.delete_commands(&ids).await {
      Ok(()) => {
        self.executed.acknowledge(&ids).await;
        debug!(count = ids.len(), "executed commands flushed");
        ids.len()
      }
      Err(err) => {
        warn!(error = %err, pending = ids.len(), "failed to flush executed commands");
        self
          .triage
          .report_auto(
            format!("failed to delete executed commands: {err}"),
            metadata([
              ("pending", ids.len().to_string()),
              ("body", err.body().unwrap_or_default().to_string()),
            ]),
          )
          .await;
        0
      }
    }
  }
}
