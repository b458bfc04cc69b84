//! Lazily-built, process-shared AWS service clients.
//!
//! One [`AwsClients`] value is constructed at process start and shared (by
//! reference, or inside an `Arc` in application state) with everything that
//! talks to AWS. Each client is built on first use with the construction
//! profile the pipeline expects and reused for the life of the process.

use std::future::Future;
use std::time::Duration;

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{Region, SdkConfig};
use tokio::sync::{OnceCell, RwLock};
use tracing::info;

use super::rds::RdsAuthTokenSigner;
use super::transfer::S3TransferManager;
use crate::config::AppConfig;
use crate::errors::AwsClientError;

/// Transport timeouts for the request/response clients.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry budget for the request/response clients, initial attempt included.
const MAX_ATTEMPTS: u32 = 3;

/// A write-once slot holding one shared client handle.
///
/// The first caller takes the write lock and builds the value; racers block
/// on the same lock and then observe the finished handle, so construction
/// runs exactly once per slot. `take` empties the slot, and the next access
/// rebuilds.
struct Slot<T>(RwLock<Option<T>>);

impl<T: Clone> Slot<T> {
    fn empty() -> Self {
        Self(RwLock::new(None))
    }

    async fn get_or_init<F, Fut>(&self, init: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(existing) = self.0.read().await.as_ref() {
            return existing.clone();
        }
        let mut slot = self.0.write().await;
        if let Some(existing) = slot.as_ref() {
            return existing.clone();
        }
        let value = init().await;
        *slot = Some(value.clone());
        value
    }

    async fn take(&self) -> Option<T> {
        self.0.write().await.take()
    }

    #[cfg(test)]
    async fn is_initialized(&self) -> bool {
        self.0.read().await.is_some()
    }
}

/// Shared AWS clients, one per service the pipeline depends on.
///
/// Request/response clients (S3 direct, SNS, SQS) carry explicit transport
/// timeouts and a bounded retry budget; the transfer client keeps the SDK
/// defaults so long multipart operations are not cut off mid-flight.
pub struct AwsClients {
    region: Region,
    base: OnceCell<SdkConfig>,
    s3: Slot<aws_sdk_s3::Client>,
    s3_transfer: Slot<aws_sdk_s3::Client>,
    transfer_manager: Slot<S3TransferManager>,
    sns: Slot<aws_sdk_sns::Client>,
    sqs: Slot<aws_sdk_sqs::Client>,
    rds_signer: Slot<RdsAuthTokenSigner>,
}

impl AwsClients {
    /// Create an empty registry for the configured region. No AWS calls are
    /// made until a client is first requested.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            region: Region::new(config.aws_region.clone()),
            base: OnceCell::new(),
            s3: Slot::empty(),
            s3_transfer: Slot::empty(),
            transfer_manager: Slot::empty(),
            sns: Slot::empty(),
            sqs: Slot::empty(),
            rds_signer: Slot::empty(),
        }
    }

    /// Convenience constructor reading the region from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `AWS_REGION` is not set.
    pub fn from_env() -> Result<Self, AwsClientError> {
        Ok(Self::new(&AppConfig::from_env()?))
    }

    /// Shared base configuration: the configured region plus the SDK's
    /// default credential chain. Loaded at most once per registry.
    async fn base_config(&self) -> &SdkConfig {
        self.base
            .get_or_init(|| async {
                aws_config::from_env()
                    .region(self.region.clone())
                    .load()
                    .await
            })
            .await
    }

    /// S3 client for request/response object operations.
    pub async fn s3(&self) -> aws_sdk_s3::Client {
        let base = self.base_config().await;
        self.s3
            .get_or_init(|| async {
                let conf = aws_sdk_s3::config::Builder::from(base)
                    .timeout_config(direct_call_timeouts())
                    .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
                    .build();
                aws_sdk_s3::Client::from_conf(conf)
            })
            .await
    }

    /// S3 client used for bulk transfers.
    pub async fn s3_transfer(&self) -> aws_sdk_s3::Client {
        let base = self.base_config().await;
        self.s3_transfer
            .get_or_init(|| async { aws_sdk_s3::Client::new(base) })
            .await
    }

    /// Transfer manager wrapping the shared transfer client.
    pub async fn transfer_manager(&self) -> S3TransferManager {
        let client = self.s3_transfer().await;
        self.transfer_manager
            .get_or_init(|| async move { S3TransferManager::new(client) })
            .await
    }

    /// SNS client for pipeline notifications.
    pub async fn sns(&self) -> aws_sdk_sns::Client {
        let base = self.base_config().await;
        self.sns
            .get_or_init(|| async {
                let conf = aws_sdk_sns::config::Builder::from(base)
                    .timeout_config(direct_call_timeouts())
                    .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
                    .build();
                aws_sdk_sns::Client::from_conf(conf)
            })
            .await
    }

    /// SQS client for the pipeline work queues.
    pub async fn sqs(&self) -> aws_sdk_sqs::Client {
        let base = self.base_config().await;
        self.sqs
            .get_or_init(|| async {
                let conf = aws_sdk_sqs::config::Builder::from(base)
                    .timeout_config(direct_call_timeouts())
                    .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
                    .build();
                aws_sdk_sqs::Client::from_conf(conf)
            })
            .await
    }

    /// Signer for IAM-authenticated database endpoints.
    pub async fn rds_signer(&self) -> RdsAuthTokenSigner {
        let base = self.base_config().await;
        self.rds_signer
            .get_or_init(|| async { RdsAuthTokenSigner::new(base.clone()) })
            .await
    }

    /// Release every cached client.
    ///
    /// Slots are emptied in reverse dependency order, so a later accessor
    /// call builds a fresh client instead of handing back a released one.
    /// The RDS signer holds only signing configuration and is left in place.
    /// Clients are reference-counted; underlying connection pools shut down
    /// once callers drop their remaining clones.
    pub async fn close_all(&self) {
        let mut released = 0usize;
        for closed in [
            self.transfer_manager.take().await.is_some(),
            self.s3_transfer.take().await.is_some(),
            self.s3.take().await.is_some(),
            self.sns.take().await.is_some(),
            self.sqs.take().await.is_some(),
        ] {
            released += usize::from(closed);
        }
        if released > 0 {
            info!("Released {} cached AWS client handles", released);
        }
    }
}

/// Timeout profile shared by the request/response clients.
fn direct_call_timeouts() -> TimeoutConfig {
    TimeoutConfig::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .read_timeout(READ_TIMEOUT)
        .build()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn test_registry() -> AwsClients {
        AwsClients::new(&AppConfig {
            aws_region: "eu-west-1".to_string(),
        })
    }

    #[tokio::test]
    async fn slot_returns_the_same_instance_on_repeat_access() {
        let slot: Slot<Arc<u32>> = Slot::empty();

        let first = slot.get_or_init(|| async { Arc::new(7) }).await;
        let second = slot.get_or_init(|| async { Arc::new(8) }).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, 7);
    }

    #[tokio::test]
    async fn slot_builds_exactly_once_under_concurrent_first_access() {
        let slot = Arc::new(Slot::<Arc<u32>>::empty());
        let built = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let slot = Arc::clone(&slot);
            let built = Arc::clone(&built);
            tasks.push(tokio::spawn(async move {
                slot.get_or_init(|| async {
                    built.fetch_add(1, Ordering::SeqCst);
                    Arc::new(42)
                })
                .await
            }));
        }

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.expect("task panicked"));
        }

        assert_eq!(built.load(Ordering::SeqCst), 1);
        for handle in &handles[1..] {
            assert!(Arc::ptr_eq(&handles[0], handle));
        }
    }

    #[tokio::test]
    async fn slot_take_resets_to_absent() {
        let slot: Slot<Arc<u32>> = Slot::empty();
        assert!(slot.take().await.is_none());

        slot.get_or_init(|| async { Arc::new(1) }).await;
        assert!(slot.take().await.is_some());
        assert!(!slot.is_initialized().await);

        let fresh = slot.get_or_init(|| async { Arc::new(2) }).await;
        assert_eq!(*fresh, 2);
    }

    #[tokio::test]
    async fn transfer_manager_populates_the_transfer_client_slot() {
        let clients = test_registry();
        assert!(!clients.s3_transfer.is_initialized().await);

        let _manager = clients.transfer_manager().await;

        assert!(clients.s3_transfer.is_initialized().await);
        assert!(clients.transfer_manager.is_initialized().await);
    }

    #[tokio::test]
    async fn close_all_only_touches_kinds_that_were_requested() {
        let clients = test_registry();
        clients.sqs().await;

        clients.close_all().await;

        assert!(!clients.sqs.is_initialized().await);
        assert!(!clients.s3.is_initialized().await);
        assert!(!clients.sns.is_initialized().await);
    }

    #[tokio::test]
    async fn close_all_leaves_the_rds_signer_in_place() {
        let clients = test_registry();
        clients.rds_signer().await;

        clients.close_all().await;

        assert!(clients.rds_signer.is_initialized().await);
    }

    #[tokio::test]
    async fn base_config_carries_the_configured_region() {
        let clients = test_registry();
        let base = clients.base_config().await;
        assert_eq!(base.region().map(ToString::to_string), Some("eu-west-1".to_string()));
    }
}
