use thiserror::Error;

#[derive(Debug, Error)]
pub enum AwsClientError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to interact with AWS services: {0}")]
    Aws(String),

    #[error("Failed to transfer object: {0}")]
    Transfer(String),

    #[error("Failed to generate database auth token: {0}")]
    DbAuth(String),
}

// Generic implementation for AWS SDK errors
impl<E, R> From<aws_sdk_s3::error::SdkError<E, R>> for AwsClientError
where
    E: std::fmt::Display,
{
    fn from(error: aws_sdk_s3::error::SdkError<E, R>) -> Self {
        AwsClientError::Aws(error.to_string())
    }
}
