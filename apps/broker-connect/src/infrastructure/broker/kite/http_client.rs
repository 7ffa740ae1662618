//! HTTP client wrapper for the Kite REST API.

use std::time::Instant;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::application::ports::BrokerAuth;
use crate::observability::metrics;

use super::api_types::KiteEnvelope;
use super::config::KiteConfig;
use super::error::KiteApiError;

/// Protocol version header required on every call.
const KITE_VERSION: &str = "3";

/// HTTP client for the Kite REST API.
///
/// Each call is a single attempt with the configured timeout. Request tokens
/// are single-use and the service treats broker outages as surfaceable
/// errors, so there is no retry loop here.
#[derive(Debug, Clone)]
pub struct KiteHttpClient {
    client: Client,
    api_base: String,
}

impl KiteHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &KiteConfig) -> Result<Self, KiteApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| KiteApiError::Config(err.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// POST a form to the API. Used by the token exchange, which signs the
    /// payload with a checksum instead of an Authorization header.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, KiteApiError> {
        let request = self
            .client
            .post(format!("{}{path}", self.api_base))
            .header("X-Kite-Version", KITE_VERSION)
            .form(form);

        self.dispatch(path, request).await
    }

    /// GET from the API with session authentication.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: &BrokerAuth,
    ) -> Result<T, KiteApiError> {
        let request = self
            .client
            .get(format!("{}{path}", self.api_base))
            .header("X-Kite-Version", KITE_VERSION)
            .header(
                "Authorization",
                format!("token {}:{}", auth.api_key, auth.access_token),
            );

        self.dispatch(path, request).await
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, KiteApiError> {
        let started = Instant::now();
        let result = send(request).await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::record_broker_request(endpoint, outcome, started.elapsed().as_secs_f64());

        result
    }
}

async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, KiteApiError> {
    let response = request.send().await.map_err(|err| {
        if err.is_timeout() {
            KiteApiError::Timeout
        } else {
            KiteApiError::Network(err.to_string())
        }
    })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| KiteApiError::Network(err.to_string()))?;

    decode_envelope(status, &body)
}

/// Decode a Kite response envelope into its payload.
fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, KiteApiError> {
    match serde_json::from_str::<KiteEnvelope<T>>(body) {
        Ok(KiteEnvelope::Success { data }) => Ok(data),
        Ok(KiteEnvelope::Error {
            error_type,
            message,
        }) => {
            if error_type == "TokenException" {
                Err(KiteApiError::TokenRejected { message })
            } else {
                Err(KiteApiError::Api {
                    status_code: status.as_u16(),
                    error_type,
                    message,
                })
            }
        }
        Err(_) if status.is_server_error() => Err(KiteApiError::Upstream {
            status: status.as_u16(),
        }),
        Err(err) => Err(KiteApiError::Protocol(format!(
            "undecodable response: {err}"
        ))),
    }
}
