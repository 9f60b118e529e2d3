//! gRPC client for the incident hub

use std::time::Duration;

use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::debug;

use crate::error::HubError;
use crate::hub_trait::HubClientTrait;
use crate::models::ChangeRecord;
use crate::proto::EventMessage;
use crate::proto::event_service_client::EventServiceClient;

/// Upper bound on a single `EmitEvent` call, including connection setup.
pub const SEND_DEADLINE: Duration = Duration::from_secs(5);

/// Hub client over a lazily connected tonic channel
#[derive(Debug, Clone)]
pub struct HubClient {
    client: EventServiceClient<Channel>,
    destination: String,
    endpoint: String,
}

impl HubClient {
    /// Create a client for `destination`.
    ///
    /// `secure` selects TLS verified against the platform trust store;
    /// otherwise the channel is plaintext. The channel is connected lazily,
    /// so an unreachable hub only surfaces as a failed send. Must be called
    /// from within a Tokio runtime.
    pub fn connect(destination: &str, secure: bool) -> Result<Self, HubError> {
        let uri = endpoint_uri(destination, secure)?;
        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| HubError::InvalidEndpoint(format!("{}: {}", uri, e)))?
            .connect_timeout(SEND_DEADLINE)
            .timeout(SEND_DEADLINE);

        if secure {
            endpoint = endpoint.tls_config(ClientTlsConfig::new().with_native_roots())?;
        }

        debug!(destination = %uri, secure, "hub channel configured");
        Ok(Self {
            client: EventServiceClient::new(endpoint.connect_lazy()),
            destination: destination.to_string(),
            endpoint: uri,
        })
    }

    /// Endpoint URI the channel dials, scheme included.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Build the endpoint URI for a destination.
///
/// Destinations are usually given as `host:port`; a scheme matching the TLS
/// mode is added when none is present.
pub fn endpoint_uri(destination: &str, secure: bool) -> Result<String, HubError> {
    let destination = destination.trim();
    if destination.is_empty() {
        return Err(HubError::InvalidEndpoint("destination is empty".to_string()));
    }
    if destination.contains("://") {
        return Ok(destination.to_string());
    }
    let scheme = if secure { "https" } else { "http" };
    Ok(format!("{}://{}", scheme, destination))
}

#[async_trait::async_trait]
impl HubClientTrait for HubClient {
    fn destination(&self) -> &str {
        &self.destination
    }

    async fn send(&self, record: ChangeRecord) -> Result<bool, HubError> {
        let mut request = tonic::Request::new(EventMessage::from(record));
        request.set_timeout(SEND_DEADLINE);

        // Generated clients take &mut self; clones share the channel.
        let mut client = self.client.clone();
        let response = tokio::time::timeout(SEND_DEADLINE, client.emit_event(request))
            .await
            .map_err(|_| HubError::DeadlineExceeded(SEND_DEADLINE))??;

        Ok(response.into_inner().acknowledged)
    }
}
