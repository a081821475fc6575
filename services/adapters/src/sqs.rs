//! SQS-backed queue transport

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::DeleteMessageBatchRequestEntry;
use aws_sdk_sqs::Client;
use config::service::queue::MAX_BATCH_SIZE;
use config::QueueSettings;
use tracing::{debug, info, warn};
use types::{DeleteEntry, RawMessage};

use crate::error::{AdapterError, Result};
use crate::traits::QueueTransport;

/// Queue transport speaking to SQS (or an SQS-compatible endpoint)
pub struct SqsQueue {
    client: Client,
    queue_arn: String,
    receive_url: String,
    max_messages: i32,
    wait_time_secs: i32,
    visibility_timeout_secs: Option<i32>,
}

impl SqsQueue {
    /// Build a client from the shared SDK config and look up the receive URL once
    pub async fn new(sdk_config: &aws_config::SdkConfig, settings: &QueueSettings) -> Result<Self> {
        let mut builder = aws_sdk_sqs::config::Builder::from(sdk_config);
        if let Some(region) = &settings.region {
            builder = builder.region(aws_sdk_sqs::config::Region::new(region.clone()));
        }
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        let client = Client::from_conf(builder.build());

        let receive_url = lookup_queue_url(&client, &settings.queue_arn).await?;
        info!(queue_arn = %settings.queue_arn, %receive_url, "📬 SQS queue transport ready");

        Ok(Self {
            client,
            queue_arn: settings.queue_arn.clone(),
            receive_url,
            max_messages: settings.max_messages,
            wait_time_secs: settings.wait_time_secs,
            visibility_timeout_secs: settings.visibility_timeout_secs,
        })
    }

    /// Default credential and region chain
    pub async fn load_sdk_config() -> aws_config::SdkConfig {
        aws_config::load_from_env().await
    }
}

/// Queue name is the last `:`-separated segment of the ARN
pub fn queue_name_from_arn(queue_arn: &str) -> Option<&str> {
    queue_arn
        .rsplit(':')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

async fn lookup_queue_url(client: &Client, queue_arn: &str) -> Result<String> {
    let queue_name = queue_name_from_arn(queue_arn).ok_or_else(|| {
        AdapterError::Configuration(format!("cannot derive queue name from ARN {queue_arn:?}"))
    })?;

    let output = client
        .get_queue_url()
        .queue_name(queue_name)
        .send()
        .await
        .map_err(|e| AdapterError::Queue {
            operation: "get-url",
            reason: DisplayErrorContext(&e).to_string(),
        })?;

    output
        .queue_url()
        .map(str::to_string)
        .ok_or_else(|| AdapterError::QueueUrlMissing {
            queue_name: queue_name.to_string(),
        })
}

#[async_trait]
impl QueueTransport for SqsQueue {
    async fn receive_batch(&self) -> Result<Vec<RawMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.receive_url)
            .max_number_of_messages(self.max_messages)
            .wait_time_seconds(self.wait_time_secs)
            .set_visibility_timeout(self.visibility_timeout_secs)
            .send()
            .await
            .map_err(|e| AdapterError::Queue {
                operation: "receive",
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        let mut messages = Vec::with_capacity(output.messages().len());
        for message in output.messages() {
            let (Some(message_id), Some(receipt_handle)) =
                (message.message_id(), message.receipt_handle())
            else {
                warn!("Skipping received message without id or receipt handle");
                continue;
            };
            messages.push(RawMessage {
                message_id: message_id.to_string(),
                receipt_handle: receipt_handle.to_string(),
                body: message.body().unwrap_or_default().to_string(),
                event_source_arn: self.queue_arn.clone(),
            });
        }

        debug!(count = messages.len(), "received messages");
        Ok(messages)
    }

    async fn delete_batch(&self, queue_url: &str, entries: &[DeleteEntry]) -> Result<()> {
        let mut failed_ids = Vec::new();

        for chunk in entries.chunks(MAX_BATCH_SIZE as usize) {
            let request_entries = chunk
                .iter()
                .map(|entry| {
                    DeleteMessageBatchRequestEntry::builder()
                        .id(&entry.id)
                        .receipt_handle(&entry.receipt_handle)
                        .build()
                        .map_err(|e| AdapterError::Queue {
                            operation: "delete",
                            reason: e.to_string(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;

            let output = self
                .client
                .delete_message_batch()
                .queue_url(queue_url)
                .set_entries(Some(request_entries))
                .send()
                .await
                .map_err(|e| AdapterError::Queue {
                    operation: "delete",
                    reason: DisplayErrorContext(&e).to_string(),
                })?;

            for failure in output.failed() {
                warn!(
                    queue_url,
                    id = failure.id(),
                    code = failure.code(),
                    message = failure.message().unwrap_or_default(),
                    "Delete rejected for message"
                );
                failed_ids.push(failure.id().to_string());
            }
        }

        if failed_ids.is_empty() {
            debug!(queue_url, count = entries.len(), "deleted messages");
            Ok(())
        } else {
            Err(AdapterError::PartialDelete {
                queue_url: queue_url.to_string(),
                failed_ids,
            })
        }
    }

    async fn resolve_queue_url(&self, queue_arn: &str) -> Result<String> {
        if queue_arn == self.queue_arn {
            return Ok(self.receive_url.clone());
        }
        lookup_queue_url(&self.client, queue_arn).await
    }
}
