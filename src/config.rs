use std::env;

use crate::errors::AwsClientError;

/// Environment-sourced settings shared by every pipeline service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub aws_region: String,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `AWS_REGION` is not set.
    pub fn from_env() -> Result<Self, AwsClientError> {
        Ok(Self {
            aws_region: env::var("AWS_REGION")
                .map_err(|e| AwsClientError::Config(format!("AWS_REGION: {e}")))?,
        })
    }
}
