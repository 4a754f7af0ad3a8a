//! Stack Auth server-side client.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;
use url::Url;

use super::{IdentityError, IdentityProvider, IdentityUser};
use crate::config::StackAuthConfig;

/// Stack Auth REST client using server credentials.
#[derive(Clone)]
pub struct StackAuthClient {
    client: reqwest::Client,
    me_url: Url,
}

impl StackAuthClient {
    /// Create a new Stack Auth client.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Config` if the credentials are not valid header
    /// values or the API URL cannot be joined, and `IdentityError::Http` if the
    /// HTTP client fails to build.
    pub fn new(config: &StackAuthConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-stack-project-id",
            HeaderValue::from_str(&config.project_id)
                .map_err(|e| IdentityError::Config(format!("invalid project id: {e}")))?,
        );

        let mut server_key = HeaderValue::from_str(config.secret_server_key.expose_secret())
            .map_err(|e| IdentityError::Config(format!("invalid server key: {e}")))?;
        server_key.set_sensitive(true);
        headers.insert("x-stack-secret-server-key", server_key);
        headers.insert("x-stack-access-type", HeaderValue::from_static("server"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        let me_url = config
            .api_url
            .join("/api/v1/users/me")
            .map_err(|e| IdentityError::Config(format!("invalid API URL: {e}")))?;

        Ok(Self { client, me_url })
    }
}

#[async_trait]
impl IdentityProvider for StackAuthClient {
    #[instrument(skip_all)]
    async fn current_user(
        &self,
        access_token: &str,
    ) -> Result<Option<IdentityUser>, IdentityError> {
        let response = self
            .client
            .get(self.me_url.clone())
            .header(super::ACCESS_TOKEN_HEADER, access_token)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::debug!(status = status.as_u16(), "access token not accepted");
            return Ok(None);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Some(response.json().await?))
    }
}
