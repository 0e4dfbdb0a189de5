//! Verity client.
//!
//! This module proxies requests through the prover and correlates each of
//! them with the proof the prover pushes back over a separate event stream.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Request};
use std::{fmt, sync::Arc};
use tracing::{debug, error, instrument, Span};
use verity_common::{NotaryInformation, NOTARY_INFO_PATH, PROOF_PATH, PROXY_PATH};

use crate::{
    channel::ChannelOpener,
    config::VerityClientConfig,
    error::{ClientError, ErrorKind},
    request::{ProxyRequest, RequestBuilder},
    request_id::RequestId,
    response::{compose, VerityResponse},
    sse::EventStreamOpener,
    subscription::ProofSubscription,
    transport::{HyperTransport, Transport},
};

/// Client that proxies requests through a prover.
///
/// Cloning is cheap; clones share the same connection pools.
#[derive(Clone)]
pub struct VerityClient {
    config: Arc<VerityClientConfig>,
    transport: Arc<dyn Transport>,
    channel_opener: Arc<dyn ChannelOpener>,
}

impl fmt::Debug for VerityClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerityClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VerityClient {
    /// Creates a client using hyper for requests and server-sent events for
    /// proofs.
    pub fn new(config: VerityClientConfig) -> Self {
        Self::with_capabilities(config, HyperTransport::new(), EventStreamOpener::new())
    }

    /// Creates a client with the given transport and proof channel opener.
    pub fn with_capabilities(
        config: VerityClientConfig,
        transport: impl Transport + 'static,
        channel_opener: impl ChannelOpener + 'static,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            channel_opener: Arc::new(channel_opener),
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &VerityClientConfig {
        &self.config
    }

    /// Convenience method to make a `GET` request to a URL.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Convenience method to make a `POST` request to a URL.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Start building a request with the `Method` and target URL.
    ///
    /// Returns a `RequestBuilder`, which will allow setting headers, the
    /// request body and a redaction instruction before sending.
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(
            self.clone(),
            ProxyRequest::new(method, url.into(), self.config.policy()),
        )
    }

    /// Executes a `ProxyRequest`.
    ///
    /// The proof channel for the request is opened before the request is
    /// dispatched, and the request is held back until the channel is ready
    /// or the gate timeout elapses.
    ///
    /// # Errors
    ///
    /// This method fails if the request could not be sent to the prover. If
    /// no proof could be obtained it fails only when the request's policy
    /// has `throw_on_error` set.
    #[instrument(
        level = "debug",
        skip_all,
        fields(method = %request.method(), url = request.url(), request_id),
        err
    )]
    pub async fn execute(&self, request: ProxyRequest) -> Result<VerityResponse, ClientError> {
        let policy = *request.policy();
        let prove_failed_request = request.proves_failed_request();

        let request_id = RequestId::new();
        Span::current().record("request_id", request_id.as_str());

        let http_request =
            request.into_http_request(&request_id, &self.config.endpoint(PROXY_PATH))?;

        let proof_url = format!("{}/{}", self.config.endpoint(PROOF_PATH), request_id);
        let mut subscription = ProofSubscription::open(
            self.channel_opener.as_ref(),
            &proof_url,
            policy.proof_timeout,
        );

        if subscription.wait_ready(policy.gate_timeout).await {
            debug!("Proof channel is ready");
        }

        debug!("Sending request to prover");
        let response = match self.transport.send(http_request).await {
            Ok(response) => response,
            Err(err) => {
                error!("Failed to proxy request through prover");
                subscription.close();
                return Err(err);
            }
        };

        if !response.status().is_success() && !prove_failed_request {
            debug!(
                "Response status is {}, the prover will not prove it",
                response.status()
            );
            subscription.close();
        }

        let outcome = subscription.outcome().await;

        compose(response, outcome, &policy)
    }

    /// Get the information of the connected notary.
    pub async fn get_notary_info(&self) -> Result<NotaryInformation, ClientError> {
        let request = Request::get(self.config.endpoint(NOTARY_INFO_PATH))
            .body(Full::new(Bytes::new()))
            .map_err(|err| {
                error!("Failed to build notary info request");
                ClientError::new(ErrorKind::Configuration, Some(Box::new(err)))
            })?;

        let response = self.transport.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::new(
                ErrorKind::Http,
                Some(format!("Notary info response status is not OK: {status}").into()),
            ));
        }

        serde_json::from_slice(response.body()).map_err(|err| {
            error!("Failed to parse notary info response payload");
            ClientError::new(ErrorKind::Internal, Some(Box::new(err)))
        })
    }
}
