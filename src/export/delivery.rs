//! Delivery-side descriptor resolution.
//!
//! The task core hands the delivery layer an ordered list of file
//! descriptors; this client materializes each into ready bytes. `buffer`
//! payloads pass through, `url` payloads are downloaded through the request
//! gateway (retry + cancellation), and `zip` payloads resolve their entries
//! and archive them.

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{DeliveryConfig, RetryConfig};
use crate::error::{Error, FetchError, Result};
use crate::export::bundle;
use crate::retry::{GatewayError, request_with_retry};
use crate::types::{FileInfo, FilePayload};

/// One materialized output artifact, ready to hand to the user
#[derive(Clone, Debug, PartialEq)]
pub struct Deliverable {
    /// Output filename
    pub filename: String,
    /// Ready bytes
    pub bytes: Vec<u8>,
}

/// Resolves file descriptors into deliverables
#[derive(Clone, Debug)]
pub struct DeliveryClient {
    http: reqwest::Client,
    retry: RetryConfig,
}

impl DeliveryClient {
    /// Create a client from delivery and retry configuration
    pub fn new(delivery: &DeliveryConfig, retry: RetryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(delivery.request_timeout)
            .build()
            .map_err(FetchError::Network)?;
        Ok(Self { http, retry })
    }

    /// Materialize one descriptor
    ///
    /// Returns `Ok(None)` when the cancellation token fires mid-resolution;
    /// cancellation is a normal outcome, not an error.
    pub async fn resolve(
        &self,
        info: &FileInfo,
        cancel: &CancellationToken,
    ) -> Result<Option<Deliverable>> {
        match &info.payload {
            FilePayload::Buffer(_) | FilePayload::Url(_) => self.resolve_leaf(info, cancel).await,
            FilePayload::Zip(entries) => {
                let mut resolved = Vec::with_capacity(entries.len());
                for entry in entries {
                    let Some(deliverable) = self.resolve_leaf(entry, cancel).await? else {
                        return Ok(None);
                    };
                    resolved.push((deliverable.filename, deliverable.bytes));
                }
                Ok(Some(Deliverable {
                    filename: info.filename.clone(),
                    bytes: bundle::archive(&info.filename, &resolved)?,
                }))
            }
        }
    }

    /// Materialize a non-bundle descriptor
    ///
    /// Bundles are one level deep, so their entries always land here. A
    /// zip-typed entry is rejected again in case the descriptor bypassed the
    /// validating constructor.
    async fn resolve_leaf(
        &self,
        info: &FileInfo,
        cancel: &CancellationToken,
    ) -> Result<Option<Deliverable>> {
        match &info.payload {
            FilePayload::Buffer(bytes) => Ok(Some(Deliverable {
                filename: info.filename.clone(),
                bytes: bytes.clone(),
            })),
            FilePayload::Url(url) => {
                let Some(bytes) = self.download(url, cancel).await? else {
                    return Ok(None);
                };
                Ok(Some(Deliverable {
                    filename: info.filename.clone(),
                    bytes,
                }))
            }
            FilePayload::Zip(_) => Err(Error::NestedArchive {
                filename: info.filename.clone(),
            }),
        }
    }

    /// Materialize a whole export in order, stopping early on cancellation
    pub async fn resolve_all(
        &self,
        infos: &[FileInfo],
        cancel: &CancellationToken,
    ) -> Result<Vec<Deliverable>> {
        let mut deliverables = Vec::with_capacity(infos.len());
        for info in infos {
            match self.resolve(info, cancel).await? {
                Some(deliverable) => deliverables.push(deliverable),
                None => {
                    tracing::info!(
                        resolved = deliverables.len(),
                        total = infos.len(),
                        "delivery cancelled"
                    );
                    break;
                }
            }
        }
        Ok(deliverables)
    }

    async fn download(&self, raw_url: &str, cancel: &CancellationToken) -> Result<Option<Vec<u8>>> {
        let url = Url::parse(raw_url)
            .map_err(|e| FetchError::Malformed(format!("invalid descriptor URL {raw_url}: {e}")))?;

        let result = request_with_retry(&self.retry, cancel, || {
            let url = url.clone();
            async move {
                let response = self.http.get(url).send().await.map_err(FetchError::from)?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        code: status.as_u16(),
                    });
                }
                let bytes = response.bytes().await.map_err(FetchError::from)?;
                Ok(bytes.to_vec())
            }
        })
        .await;

        match result {
            Ok(bytes) => {
                tracing::debug!(url = %url, bytes = bytes.len(), "media downloaded");
                Ok(Some(bytes))
            }
            Err(GatewayError::Cancelled) => Ok(None),
            Err(GatewayError::Failed(e)) => Err(Error::Fetch(e)),
        }
    }
}
