//! HTTP transport for Conduit.

use super::ConduitApi;
use crate::error::{PhabError, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

/// Conduit over HTTP(S) using reqwest's blocking client.
#[derive(Debug, Clone)]
pub struct HttpConduit {
    client: reqwest::blocking::Client,
    api_url: String,
    token: String,
}

impl HttpConduit {
    /// Create a transport for the Phabricator instance at `url`.
    pub fn new(url: &str, token: &str) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(concat!(
                "phabstack/",
                env!("CARGO_PKG_VERSION")
            )),
        );
        let client = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .build()
            .map_err(|e| PhabError::TransportError(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: format!("{}/api/", url.trim_end_matches('/')),
            token: token.to_string(),
        })
    }
}

impl ConduitApi for HttpConduit {
    fn call(&self, method: &str, args: Value) -> Result<Value> {
        let mut params = match args {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(PhabError::UserError(format!(
                    "Conduit arguments for {} must be an object, got {}",
                    method, other
                )));
            }
        };
        params.insert("__conduit__".to_string(), json!({ "token": self.token }));
        let params = Value::Object(params).to_string();

        let url = format!("{}{}", self.api_url, method);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .form(&[("params", params.as_str()), ("output", "json"), ("__conduit__", "1")])
            .send()
            .map_err(|e| PhabError::TransportError(format!("{}: {}", method, e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| PhabError::TransportError(format!("{}: {}", method, e)))?;
        if !status.is_success() {
            return Err(PhabError::TransportError(format!(
                "{}: HTTP {}",
                method, status
            )));
        }

        parse_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_info: Option<String>,
}

/// Decode a Conduit response envelope.
///
/// A non-null `error_code` becomes [`PhabError::ApiError`]; otherwise the
/// `result` member is returned.
pub fn parse_response(body: &str) -> Result<Value> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| PhabError::TransportError(format!("invalid JSON response: {}", e)))?;

    match envelope.error_code {
        Some(code) => Err(PhabError::ApiError {
            code,
            info: envelope.error_info.unwrap_or_default(),
        }),
        None => Ok(envelope.result),
    }
}
