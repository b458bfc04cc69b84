/// Shared AWS client wiring for the data-pipeline services.
///
/// Every service in the pipeline talks to the same small set of AWS
/// dependencies: S3 for object storage, SNS for notifications, SQS for work
/// queues, and IAM-authenticated RDS endpoints. This crate owns the
/// construction profile for each of those clients and hands out shared,
/// lazily-built handles through [`clients::AwsClients`].
///
/// # Architecture
///
/// The system uses:
/// - aws-config for region and credential-chain resolution
/// - per-service aws-sdk crates for the actual clients
/// - Tokio for async runtime and one-time initialization
///
/// # Example
///
/// ```no_run
/// use datapipeline_aws::clients::AwsClients;
/// use datapipeline_aws::config::AppConfig;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Set up structured logging
///     datapipeline_aws::setup_logging();
///
///     let config = AppConfig::from_env()?;
///     let clients = AwsClients::new(&config);
///
///     // Built on first use, reused afterwards
///     let s3 = clients.s3().await;
///     let buckets = s3.list_buckets().send().await?;
///     println!("{} buckets visible", buckets.buckets().len());
///
///     // Release every cached client before shutdown
///     clients.close_all().await;
///     Ok(())
/// }
/// ```
// Module declarations
pub mod clients;
pub mod config;
pub mod errors;

/// Configure structured logging with JSON format for AWS environments.
///
/// This function sets up tracing-subscriber with a JSON formatter suitable for
/// `CloudWatch` Logs integration. It should be called once at process start,
/// before the first client is requested.
///
/// # Example
///
/// ```
/// // Initialize structured logging at process start
/// datapipeline_aws::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    tracing_subscriber::registry().with(fmt_layer).init();
}
