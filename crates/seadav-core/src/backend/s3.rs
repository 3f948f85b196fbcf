//! S3-style blob backend.

use crate::error::StoreError;
use crate::obj::{ObjectId, ObjectKind};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tokio::sync::OnceCell;
use tracing::debug;

/// Credentials and bucket for one object kind.
///
/// Objects are keyed by their bare id; one bucket per kind.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub key_id: String,
    pub key: String,
    pub bucket: String,
    /// Optional custom endpoint for S3-compatible stores.
    pub endpoint: Option<String>,
}

/// Backend reading objects from an S3 bucket.
///
/// The client is built on first use and shared across requests.
pub struct S3Backend {
    config: S3Config,
    kind: ObjectKind,
    client: OnceCell<Client>,
}

impl S3Backend {
    pub fn new(config: S3Config, kind: ObjectKind) -> Self {
        S3Backend {
            config,
            kind,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let credentials = Credentials::from_keys(
                    self.config.key_id.clone(),
                    self.config.key.clone(),
                    None,
                );
                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .credentials_provider(credentials)
                    .region(aws_config::Region::new("us-east-1"));
                if let Some(endpoint) = &self.config.endpoint {
                    loader = loader.endpoint_url(endpoint.clone());
                }
                let shared = loader.load().await;
                debug!(bucket = %self.config.bucket, "connected s3 object backend");
                Client::new(&shared)
            })
            .await
    }
}

#[async_trait]
impl super::BlobBackend for S3Backend {
    async fn read(
        &self,
        _store_id: &str,
        _version: u32,
        obj_id: &ObjectId,
    ) -> Result<Bytes, StoreError> {
        let client = self.client().await;
        let output = client
            .get_object()
            .bucket(&self.config.bucket)
            .key(obj_id.as_str())
            .send()
            .await
            .map_err(|e| {
                let service = e.into_service_error();
                if service.is_no_such_key() {
                    StoreError::NotFound {
                        kind: self.kind,
                        id: obj_id.to_string(),
                    }
                } else {
                    StoreError::BackendUnavailable(service.to_string())
                }
            })?;

        output
            .body
            .collect()
            .await
            .map(aws_sdk_s3::primitives::AggregatedBytes::into_bytes)
            .map_err(|e| StoreError::BackendUnavailable(e.to_string()))
    }
}
