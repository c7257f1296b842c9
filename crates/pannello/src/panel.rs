//! The fetch → validate → render-or-error pipeline shared by every panel.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{Backend, Endpoint, Reply, TransportError};
use crate::chart::Chart;
use crate::types::{ProfileField, UserProfile};
use crate::view::PanelView;

/// Message shown for any transport failure
pub const FETCH_FAILED: &str = "Failed to fetch data. Please try again later.";

/// Why a panel could not render its chart
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PanelError {
    /// The profile lacks fields this panel needs; no request was sent
    #[error("{message}")]
    MissingFields {
        fields: Vec<ProfileField>,
        message: &'static str,
    },

    #[error("{}", FETCH_FAILED)]
    Transport(String),

    /// Error text reported by the backend, shown verbatim
    #[error("{0}")]
    Server(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Panel stopped unexpectedly: {0}")]
    Crashed(String),
}

/// A successful reply body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    /// Non-JSON body, e.g. a server-rendered HTML fragment
    Text(String),
}

impl Payload {
    pub fn json(&self) -> Result<&Value, PanelError> {
        match self {
            Payload::Json(value) => Ok(value),
            Payload::Text(_) => Err(PanelError::Decode("expected a JSON body".to_string())),
        }
    }
}

/// What a panel shows once its data arrived
#[derive(Debug, Clone, PartialEq)]
pub enum PanelContent {
    Chart { chart: Chart, notes: Vec<String> },
    /// Hourly weather icon keys, index = hour of day
    WeatherIcons(Vec<String>),
    /// Markup produced by the backend
    Fragment(String),
}

/// Requests a panel issues per refresh
#[derive(Debug, Clone, Copy)]
pub enum Requests {
    Single(Endpoint),
    /// Two requests sent concurrently with the same body
    Pair(Endpoint, Endpoint),
}

/// Static description of one panel
pub struct PanelDef {
    pub requests: Requests,
    pub required: fn(&UserProfile) -> Vec<ProfileField>,
    pub missing_message: &'static str,
    pub body: fn(&UserProfile) -> Value,
    pub map: fn(Vec<Payload>) -> Result<PanelContent, PanelError>,
}

impl PanelDef {
    pub fn missing_fields(&self, profile: &UserProfile) -> Vec<ProfileField> {
        profile.missing_fields(&(self.required)(profile))
    }
}

/// Validate, fetch and map one panel without touching any view
pub async fn fetch_panel<B: Backend>(
    def: &PanelDef,
    profile: &UserProfile,
    backend: &B,
) -> Result<PanelContent, PanelError> {
    let missing = def.missing_fields(profile);
    if !missing.is_empty() {
        return Err(PanelError::MissingFields {
            fields: missing,
            message: def.missing_message,
        });
    }

    let body = (def.body)(profile);
    let payloads = match def.requests {
        Requests::Single(endpoint) => {
            let reply = backend.post(endpoint, body).await;
            vec![interpret(endpoint, reply)?]
        }
        Requests::Pair(first, second) => {
            let (a, b) = tokio::join!(backend.post(first, body.clone()), backend.post(second, body));
            combine(vec![interpret(first, a), interpret(second, b)])?
        }
    };

    (def.map)(payloads)
}

/// Run one panel and push the outcome into `view`.
///
/// The outcome is also returned so callers can log or count it.
pub async fn run_panel<B: Backend>(
    name: &str,
    def: &PanelDef,
    profile: &UserProfile,
    backend: &B,
    view: &dyn PanelView,
) -> Result<(), PanelError> {
    match fetch_panel(def, profile, backend).await {
        Ok(content) => {
            debug!(panel = name, "Panel rendered");
            view.show(&content);
            Ok(())
        }
        Err(e) => {
            match &e {
                PanelError::MissingFields { fields, .. } => {
                    let names: Vec<&str> = fields.iter().map(|f| f.name()).collect();
                    info!(panel = name, missing = ?names, "Panel skipped, profile incomplete");
                }
                other => warn!(panel = name, error = %other, "Panel failed"),
            }
            view.show_error(&e.to_string());
            Err(e)
        }
    }
}

/// Turn a raw reply into a payload or the error to show
fn interpret(endpoint: Endpoint, reply: Result<Reply, TransportError>) -> Result<Payload, PanelError> {
    let reply = reply.map_err(|e| {
        warn!(endpoint = %endpoint, error = %e, "Transport failure");
        PanelError::Transport(e.message)
    })?;

    match serde_json::from_str::<Value>(&reply.body) {
        Ok(value) => {
            if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
                let text = match error {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                return Err(PanelError::Server(text));
            }
            if !reply.is_success() {
                return Err(status_error(reply.status));
            }
            Ok(Payload::Json(value))
        }
        Err(_) if reply.is_success() => Ok(Payload::Text(reply.body)),
        Err(_) => Err(status_error(reply.status)),
    }
}

fn status_error(status: u16) -> PanelError {
    PanelError::Server(format!("Request failed with status {}", status))
}

/// Merge the outcomes of concurrent requests.
///
/// A transport failure wins; otherwise server errors are joined with a space.
fn combine(results: Vec<Result<Payload, PanelError>>) -> Result<Vec<Payload>, PanelError> {
    if let Some(Err(e)) = results
        .iter()
        .find(|r| matches!(r, Err(PanelError::Transport(_))))
    {
        return Err(e.clone());
    }

    let mut payloads = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(payload) => payloads.push(payload),
            Err(e) => errors.push(e.to_string()),
        }
    }

    if errors.is_empty() {
        Ok(payloads)
    } else {
        Err(PanelError::Server(errors.join(" ")))
    }
}
