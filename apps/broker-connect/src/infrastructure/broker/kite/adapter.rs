//! Kite Connect adapter implementing `BrokerPort`.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::application::ports::{BrokerAuth, BrokerError, BrokerPort, BrokerSession};
use crate::domain::position::{BrokerProfile, MarginSummary, PositionBook};

use super::api_types::{
    KiteMarginsResponse, KitePositionsResponse, KiteProfileResponse, KiteSessionResponse,
};
use super::config::KiteConfig;
use super::error::KiteApiError;
use super::http_client::KiteHttpClient;

/// Kite Connect broker adapter.
///
/// Implements `BrokerPort` for the Zerodha Kite Connect API.
#[derive(Debug, Clone)]
pub struct KiteConnectAdapter {
    client: KiteHttpClient,
    login_base: reqwest::Url,
}

impl KiteConnectAdapter {
    /// Create a new Kite adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if the login base URL does not parse or the HTTP
    /// client cannot be built.
    pub fn new(config: KiteConfig) -> Result<Self, KiteApiError> {
        let login_base = reqwest::Url::parse(&config.login_base)
            .map_err(|err| KiteApiError::Config(format!("login base url: {err}")))?;
        let client = KiteHttpClient::new(&config)?;

        Ok(Self { client, login_base })
    }
}

/// Exchange checksum: SHA-256 over the concatenation of API key, request
/// token, and API secret, hex encoded.
fn session_checksum(api_key: &str, request_token: &str, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hasher.update(request_token.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl BrokerPort for KiteConnectAdapter {
    fn authorization_url(&self, api_key: &str, redirect_uri: &str) -> String {
        let mut url = self.login_base.clone();
        url.set_path("/connect/login");
        url.query_pairs_mut()
            .clear()
            .append_pair("v", "3")
            .append_pair("api_key", api_key)
            .append_pair("redirect_uri", redirect_uri);
        url.to_string()
    }

    async fn exchange_request_token(
        &self,
        api_key: &str,
        api_secret: &str,
        request_token: &str,
    ) -> Result<BrokerSession, BrokerError> {
        let checksum = session_checksum(api_key, request_token, api_secret);
        let form = [
            ("api_key", api_key),
            ("request_token", request_token),
            ("checksum", checksum.as_str()),
        ];

        let response: KiteSessionResponse = self
            .client
            .post_form("/session/token", &form)
            .await
            .map_err(|err| BrokerError::ExchangeFailed {
                reason: err.to_string(),
            })?;

        tracing::info!("broker session established");
        Ok(response.into_session())
    }

    async fn fetch_profile(&self, auth: &BrokerAuth) -> Result<BrokerProfile, BrokerError> {
        let response: KiteProfileResponse = self
            .client
            .get("/user/profile", auth)
            .await
            .map_err(BrokerError::from)?;

        Ok(response.into_profile())
    }

    async fn fetch_margins(&self, auth: &BrokerAuth) -> Result<MarginSummary, BrokerError> {
        let response: KiteMarginsResponse = self
            .client
            .get("/user/margins", auth)
            .await
            .map_err(BrokerError::from)?;

        Ok(response.into_summary())
    }

    async fn fetch_positions(&self, auth: &BrokerAuth) -> Result<PositionBook, BrokerError> {
        let response: KitePositionsResponse = self
            .client
            .get("/portfolio/positions", auth)
            .await
            .map_err(BrokerError::from)?;

        Ok(response.into_book())
    }
}
