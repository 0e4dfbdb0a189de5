//! HTTP transport capability used to reach the prover.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper::{Request, Response};
use hyper_tls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tracing::{debug, error};

use crate::error::{ClientError, ErrorKind};

/// Sends HTTP requests to the prover.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response with its body fully read.
    ///
    /// Non-success statuses are not errors at this level.
    async fn send(&self, request: Request<Full<Bytes>>) -> Result<Response<Bytes>, ClientError>;
}

/// [`Transport`] backed by a pooled hyper client, supporting both HTTP and
/// HTTPS provers.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HyperTransport {
    /// Creates a new transport with its own connection pool.
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build(HttpsConnector::new()),
        }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: Request<Full<Bytes>>) -> Result<Response<Bytes>, ClientError> {
        debug!("Sending request: {} {}", request.method(), request.uri());

        let response = self.client.request(request).await.map_err(|err| {
            error!("Failed to send http request to prover");
            ClientError::new(ErrorKind::Http, Some(Box::new(err)))
        })?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|err| {
                error!("Failed to read http response from prover");
                ClientError::new(ErrorKind::Http, Some(Box::new(err)))
            })?
            .to_bytes();

        debug!("Received response: {}", parts.status);

        Ok(Response::from_parts(parts, body))
    }
}
