//! Client side of the backend endpoints.
//!
//! Every endpoint is a JSON POST. The [`Backend`] trait is the seam between
//! the panels and the network so panels can be driven by a stub in tests.

use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Backend endpoints consumed by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Weather,
    DayAheadPrices,
    GenerationMix,
    PvGeneration,
    Sell,
    ProductionDay,
    ConsumptionDay,
    SurplusDay,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Weather => "/weather",
            Endpoint::DayAheadPrices => "/day_ahead_prices",
            Endpoint::GenerationMix => "/actual_gen_type",
            Endpoint::PvGeneration => "/PVgen",
            Endpoint::Sell => "/sell",
            Endpoint::ProductionDay => "/get_production_day",
            Endpoint::ConsumptionDay => "/get_consumption_day",
            Endpoint::SurplusDay => "/get_surplus_day",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Raw answer from the backend: status code plus the undecoded body
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a reply (connection refused, timeout, ...)
#[derive(Debug, Clone, Error)]
#[error("request to {endpoint} failed: {message}")]
pub struct TransportError {
    pub endpoint: Endpoint,
    pub message: String,
}

/// Something that answers JSON POSTs to the backend endpoints
pub trait Backend: Send + Sync + 'static {
    fn post(
        &self,
        endpoint: Endpoint,
        body: Value,
    ) -> impl Future<Output = Result<Reply, TransportError>> + Send;
}

/// [`Backend`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Returns a new backend client
    ///
    /// # Arguments
    ///
    /// * 'base_url' - scheme, host and port of the backend, e.g. `http://127.0.0.1:5000`
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

impl Backend for HttpBackend {
    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<Reply, TransportError> {
        let transport = |e: reqwest::Error| TransportError {
            endpoint,
            message: e.to_string(),
        };

        debug!(endpoint = %endpoint, "Sending request");
        let response = self
            .client
            .post(self.url(endpoint))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;
        debug!(endpoint = %endpoint, status, bytes = body.len(), "Received reply");

        Ok(Reply::new(status, body))
    }
}
