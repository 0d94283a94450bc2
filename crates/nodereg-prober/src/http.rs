//! HTTP implementation of [`NodeProber`].

use crate::{NodeProber, ProbeConfig, ProbeOutcome, ProbePayload, Result};
use async_trait::async_trait;
use nodereg_core::{EndpointRole, NodeRecord};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

/// Longest body excerpt kept in an [`ProbeOutcome::Unresponsive`].
const BODY_EXCERPT_CHARS: usize = 200;

/// Probes nodes with `GET` requests over a shared connection pool.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

/// A response whose body was read in full.
struct RawBody {
    status: reqwest::StatusCode,
    text: String,
}

impl HttpProber {
    /// Builds a prober with the given timeouts and user agent.
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, url: &str) -> std::result::Result<RawBody, String> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| format!("GET {url}: {e}"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| format!("reading body of {url}: {e}"))?;
        Ok(RawBody { status, text })
    }
}

#[async_trait]
impl NodeProber for HttpProber {
    async fn probe(&self, name: &str, record: &NodeRecord) -> ProbeOutcome {
        let endpoints = match record.endpoints() {
            Ok(endpoints) => endpoints,
            Err(unresolved) => {
                return ProbeOutcome::Offline {
                    reason: unresolved.to_string(),
                }
            }
        };

        debug!("Probing node '{}' at {}", name, endpoints.version);
        let (version, services) = tokio::join!(
            self.fetch(&endpoints.version),
            self.fetch(&endpoints.collection)
        );

        let (version, services) = match (version, services) {
            (Ok(version), Ok(services)) => (version, services),
            (Err(reason), _) | (_, Err(reason)) => return ProbeOutcome::Offline { reason },
        };

        for (role, body) in [(EndpointRole::Version, &version), (EndpointRole::Collection, &services)] {
            if !body.status.is_success() {
                debug!("Node '{}' answered {} for {}", name, body.status, role);
            }
        }

        let version = match decode_object(&version.text) {
            Some(object) => object,
            None => return unresponsive(EndpointRole::Version, &version.text),
        };
        let services = match decode_object(&services.text) {
            Some(object) => object,
            None => return unresponsive(EndpointRole::Collection, &services.text),
        };

        ProbeOutcome::Fetched(ProbePayload { version, services })
    }
}

fn decode_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn unresponsive(role: EndpointRole, text: &str) -> ProbeOutcome {
    ProbeOutcome::Unresponsive {
        role,
        body: excerpt(text),
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(BODY_EXCERPT_CHARS).collect()
}
