//! IAM auth-token signing for RDS database endpoints.

use aws_config::SdkConfig;
use aws_sdk_rds::auth_token::{AuthTokenGenerator, Config as AuthTokenConfig};

use crate::errors::AwsClientError;

/// Signer for short-lived IAM database auth tokens.
///
/// Holds only the shared SDK configuration (region and credential chain);
/// there is no connection to release.
#[derive(Debug, Clone)]
pub struct RdsAuthTokenSigner {
    sdk_config: SdkConfig,
}

impl RdsAuthTokenSigner {
    pub(crate) fn new(sdk_config: SdkConfig) -> Self {
        Self { sdk_config }
    }

    /// Generate an auth token usable as the password of an IAM-authenticated
    /// database connection. Tokens expire after 15 minutes and are not
    /// cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the token request is invalid or signing fails.
    pub async fn auth_token(
        &self,
        hostname: &str,
        port: u16,
        username: &str,
    ) -> Result<String, AwsClientError> {
        let config = AuthTokenConfig::builder()
            .hostname(hostname)
            .port(port.into())
            .username(username)
            .build()
            .map_err(|e| AwsClientError::DbAuth(format!("invalid token request: {e}")))?;

        let token = AuthTokenGenerator::new(config)
            .auth_token(&self.sdk_config)
            .await
            .map_err(|e| AwsClientError::DbAuth(format!("signing failed: {e}")))?;

        Ok(token.to_string())
    }
}
