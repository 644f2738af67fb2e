use crate::config::GatewaySettings;
use crate::domain::ports::PaymentGateway;
use crate::domain::remote_order::{CreateOrderRequest, RemoteOrder};
use crate::error::GatewayError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use tracing::debug;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

/// Gateway client speaking the Razorpay orders REST API.
///
/// Authenticates with HTTP basic auth (key id / key secret). Every request uses
/// the configured timeout and is sent exactly once.
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    key_id: String,
    key_secret: String,
}

impl HttpGateway {
    pub fn new(settings: &GatewaySettings) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(settings.base_url.trim_end_matches('/'))
            .map_err(|e| GatewayError::Transport(format!("invalid base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Transport(format!(
                "invalid base URL: {}",
                settings.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            key_id: settings.key_id.clone(),
            key_secret: settings.key_secret.clone(),
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<RemoteOrder, GatewayError> {
        let response = request
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        debug!(status = status.as_u16(), "razorpay response received");

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()));
        }

        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => Err(GatewayError::Api {
                status: status.as_u16(),
                code: envelope.error.code,
                description: envelope.error.description,
            }),
            Err(_) => Err(GatewayError::Decode(format!("HTTP {}: {}", status, body))),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn fetch_order(&self, id: &str) -> Result<RemoteOrder, GatewayError> {
        let url = self.endpoint(&["orders", id]);
        self.send(self.client.get(url)).await
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<RemoteOrder, GatewayError> {
        let url = self.endpoint(&["orders"]);
        self.send(self.client.post(url).json(request)).await
    }
}
