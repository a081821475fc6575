//! Queue ARN to URL resolution, cached per ARN

use std::sync::Arc;

use adapter_service::QueueTransport;

use crate::cache::FlightCache;
use crate::error::{PipelineError, Result};

pub struct QueueUrlCache {
    transport: Arc<dyn QueueTransport>,
    cache: FlightCache<String, String>,
}

impl QueueUrlCache {
    pub fn new(transport: Arc<dyn QueueTransport>) -> Self {
        Self {
            transport,
            cache: FlightCache::unbounded(),
        }
    }

    pub async fn resolve(&self, queue_arn: &str) -> Result<String> {
        let transport = self.transport.clone();
        let key = queue_arn.to_string();
        let arn = key.clone();
        self.cache
            .get_or_fetch(&key, move || async move {
                transport.resolve_queue_url(&arn).await
            })
            .await
            .map_err(|source| PipelineError::QueueUrl {
                queue_arn: queue_arn.to_string(),
                source,
            })
    }
}
