use std::sync::LazyLock;

use crate::config::OAuth2ProviderConfig;

use super::errors::OAuth2Error;
use super::types::{OidcTokenResponse, ProviderUserInfo};

/// Shared HTTP client; per-call timeouts are set on each request so the
/// engine config stays the single source of truth.
static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(reqwest::Client::new);

fn get_client() -> &'static reqwest::Client {
    &HTTP_CLIENT
}

#[derive(Clone)]
pub struct OAuth2Client {
    provider: OAuth2ProviderConfig,
    timeout: std::time::Duration,
    retries: u32,
}

impl OAuth2Client {
    pub fn new(
        provider: OAuth2ProviderConfig,
        timeout: std::time::Duration,
        retries: u32,
    ) -> Self {
        Self {
            provider,
            timeout,
            retries,
        }
    }

    /// Exchange an authorization code for tokens.
    ///
    /// Transient network failures and timeouts are retried up to the bound;
    /// any HTTP response — success or rejection — ends the loop immediately,
    /// so a 4xx is never retried.
    pub async fn exchange_code(&self, code: &str) -> Result<OidcTokenResponse, OAuth2Error> {
        let client = get_client();
        let mut attempt = 0;

        loop {
            let result = client
                .post(&self.provider.token_url)
                .timeout(self.timeout)
                .form(&[
                    ("code", code.to_string()),
                    ("client_id", self.provider.client_id.clone()),
                    ("client_secret", self.provider.client_secret.clone()),
                    ("redirect_uri", self.provider.redirect_uri.clone()),
                    ("grant_type", "authorization_code".to_string()),
                ])
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .map_err(|e| OAuth2Error::Network(e.to_string()))?;

                    if !status.is_success() {
                        tracing::debug!(status = %status, "Token exchange rejected");
                        return Err(OAuth2Error::Rejected(status.to_string()));
                    }

                    return serde_json::from_str(&body).map_err(|e| {
                        OAuth2Error::Serde(format!("Failed to deserialize token response: {e}"))
                    });
                }
                Err(e) if e.is_timeout() => {
                    if attempt >= self.retries {
                        return Err(OAuth2Error::Timeout);
                    }
                    tracing::warn!(attempt, "Token exchange timed out; retrying");
                }
                Err(e) if e.is_connect() => {
                    if attempt >= self.retries {
                        return Err(OAuth2Error::Network(e.to_string()));
                    }
                    tracing::warn!(attempt, error = %e, "Token exchange connection failed; retrying");
                }
                Err(e) => return Err(OAuth2Error::Network(e.to_string())),
            }
            attempt += 1;
        }
    }

    /// Fetch the provider's user profile with the exchanged access token.
    pub async fn fetch_user_info(
        &self,
        access_token: &str,
    ) -> Result<ProviderUserInfo, OAuth2Error> {
        let client = get_client();
        let mut attempt = 0;

        loop {
            let result = client
                .get(&self.provider.userinfo_url)
                .timeout(self.timeout)
                .bearer_auth(access_token)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .map_err(|e| OAuth2Error::Network(e.to_string()))?;

                    if !status.is_success() {
                        tracing::debug!(status = %status, "Userinfo fetch rejected");
                        return Err(OAuth2Error::Rejected(status.to_string()));
                    }

                    return serde_json::from_str(&body).map_err(|e| {
                        OAuth2Error::Serde(format!("Failed to deserialize userinfo: {e}"))
                    });
                }
                Err(e) if e.is_timeout() => {
                    if attempt >= self.retries {
                        return Err(OAuth2Error::Timeout);
                    }
                    tracing::warn!(attempt, "Userinfo fetch timed out; retrying");
                }
                Err(e) if e.is_connect() => {
                    if attempt >= self.retries {
                        return Err(OAuth2Error::Network(e.to_string()));
                    }
                    tracing::warn!(attempt, error = %e, "Userinfo fetch connection failed; retrying");
                }
                Err(e) => return Err(OAuth2Error::Network(e.to_string())),
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base: &str) -> OAuth2ProviderConfig {
        OAuth2ProviderConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_uri: "https://app.example/callback".to_string(),
            token_url: format!("{base}/token"),
            userinfo_url: format!("{base}/userinfo"),
        }
    }

    #[tokio::test]
    async fn test_connection_failure_maps_to_network_error() {
        // Nothing listens on this port; connection is refused immediately
        let client = OAuth2Client::new(
            provider("http://127.0.0.1:1"),
            std::time::Duration::from_secs(2),
            0,
        );

        let result = client.exchange_code("some-code").await;
        assert!(matches!(
            result,
            Err(OAuth2Error::Network(_)) | Err(OAuth2Error::Timeout)
        ));
    }
}
