//! Deletes settled messages from their queues

use std::sync::Arc;

use adapter_service::{AdapterError, QueueTransport};
use futures::future::join_all;
use tracing::{debug, warn};
use types::{group_by_queue, AcknowledgeEntry, RawMessage};

use crate::error::PipelineError;
use crate::queue_urls::QueueUrlCache;

/// Result of one acknowledgment pass; failures are counted, never raised
#[derive(Debug, Default)]
pub struct AcknowledgeSummary {
    pub acknowledged: usize,
    pub failed: usize,
    pub errors: Vec<PipelineError>,
}

impl AcknowledgeSummary {
    fn absorb(&mut self, other: AcknowledgeSummary) {
        self.acknowledged += other.acknowledged;
        self.failed += other.failed;
        self.errors.extend(other.errors);
    }
}

pub struct Acknowledger {
    transport: Arc<dyn QueueTransport>,
    queue_urls: QueueUrlCache,
}

impl Acknowledger {
    pub fn new(transport: Arc<dyn QueueTransport>) -> Self {
        Self {
            queue_urls: QueueUrlCache::new(transport.clone()),
            transport,
        }
    }

    /// Delete `messages`, grouped into one batch per source queue
    ///
    /// A message whose queue URL cannot be resolved, or whose delete is rejected, stays on
    /// the queue and is redelivered after its visibility timeout.
    pub async fn acknowledge(&self, messages: &[&RawMessage]) -> AcknowledgeSummary {
        let mut summary = AcknowledgeSummary::default();
        if messages.is_empty() {
            return summary;
        }

        let resolved = join_all(messages.iter().map(|message| async move {
            self.queue_urls
                .resolve(&message.event_source_arn)
                .await
                .map(|queue_url| AcknowledgeEntry {
                    queue_url,
                    message_id: message.message_id.clone(),
                    receipt_handle: message.receipt_handle.clone(),
                })
        }))
        .await;

        let mut entries = Vec::with_capacity(resolved.len());
        for result in resolved {
            match result {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(error = %e, "Leaving message on queue, no queue URL");
                    summary.failed += 1;
                    summary.errors.push(e);
                }
            }
        }

        let deletions = join_all(group_by_queue(entries).into_iter().map(
            |(queue_url, batch)| async move {
                let mut outcome = AcknowledgeSummary::default();
                match self.transport.delete_batch(&queue_url, &batch).await {
                    Ok(()) => {
                        debug!(%queue_url, count = batch.len(), "acknowledged messages");
                        outcome.acknowledged = batch.len();
                    }
                    Err(e) => {
                        let failed = match &e {
                            AdapterError::PartialDelete { failed_ids, .. } => failed_ids.len(),
                            _ => batch.len(),
                        };
                        warn!(%queue_url, failed, error = %e, "Failed to delete messages");
                        outcome.acknowledged = batch.len().saturating_sub(failed);
                        outcome.failed = failed;
                        outcome.errors.push(PipelineError::Acknowledge { queue_url, source: e });
                    }
                }
                outcome
            },
        ))
        .await;

        for outcome in deletions {
            summary.absorb(outcome);
        }
        summary
    }
}
