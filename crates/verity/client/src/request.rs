use std::{convert::TryFrom, future::IntoFuture, time::Duration};

use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::Full;
use hyper::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Method, Request, Uri,
};
use serde::Serialize;
use verity_common::{PROVE_FAILED_REQ_HEADER, PROXY_URL_HEADER, REDACTED_HEADER, REQUEST_ID_HEADER};

use crate::{
    client::VerityClient,
    config::ProofPolicy,
    error::{ClientError, ErrorKind},
    request_id::RequestId,
    response::VerityResponse,
};

/// A request to be proxied through the prover.
///
/// Obtained from [`RequestBuilder::build`]; it can be inspected before being
/// passed to [`VerityClient::execute`].
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Bytes,
    redact: Option<String>,
    prove_failed_request: bool,
    policy: ProofPolicy,
}

impl ProxyRequest {
    pub(crate) fn new(method: Method, url: String, policy: ProofPolicy) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            redact: None,
            prove_failed_request: false,
            policy,
        }
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the URL the prover forwards the request to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the headers forwarded to the target.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the redaction instruction, if any.
    pub fn redaction(&self) -> Option<&str> {
        self.redact.as_deref()
    }

    /// Returns whether the prover is asked to prove non-success responses.
    pub fn proves_failed_request(&self) -> bool {
        self.prove_failed_request
    }

    /// Returns the proof policy of this request.
    pub fn policy(&self) -> &ProofPolicy {
        &self.policy
    }

    /// Builds the HTTP request sent to the prover's proxy endpoint, carrying
    /// the correlation metadata in headers.
    pub(crate) fn into_http_request(
        self,
        request_id: &RequestId,
        proxy_endpoint: &str,
    ) -> Result<Request<Full<Bytes>>, ClientError> {
        let uri: Uri = proxy_endpoint.parse().map_err(|err| {
            ClientError::new(ErrorKind::Configuration, Some(Box::new(err)))
        })?;

        let mut headers = self.headers;
        insert_header(&mut headers, REQUEST_ID_HEADER, header_value(request_id.as_str())?)?;
        insert_header(&mut headers, PROXY_URL_HEADER, header_value(&self.url)?)?;
        if let Some(redact) = &self.redact {
            insert_header(&mut headers, REDACTED_HEADER, header_value(redact)?)?;
        }
        if self.prove_failed_request {
            insert_header(
                &mut headers,
                PROVE_FAILED_REQ_HEADER,
                HeaderValue::from_static("true"),
            )?;
        }

        let mut request = Request::new(Full::new(self.body));
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;

        Ok(request)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).map_err(builder_error)
}

// Replaces any value the caller may have set under the same name.
fn insert_header(
    headers: &mut HeaderMap,
    name: &str,
    value: HeaderValue,
) -> Result<(), ClientError> {
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(builder_error)?;
    headers.insert(name, value);
    Ok(())
}

fn builder_error(err: impl Into<http::Error>) -> ClientError {
    ClientError::new(ErrorKind::Builder, Some(Box::new(err.into())))
}

/// A builder to construct the properties of a proxied request.
///
/// To construct a `RequestBuilder`, refer to the [`VerityClient`]
/// documentation. The builder can be awaited directly, which is equivalent to
/// calling [`send`](Self::send).
#[must_use = "RequestBuilder does nothing until you 'send' it"]
pub struct RequestBuilder {
    client: VerityClient,
    request: Result<ProxyRequest, ClientError>,
}

impl RequestBuilder {
    pub(crate) fn new(client: VerityClient, request: ProxyRequest) -> Self {
        Self {
            client,
            request: Ok(request),
        }
    }

    fn map(mut self, f: impl FnOnce(&mut ProxyRequest) -> Result<(), ClientError>) -> Self {
        self.request = self.request.and_then(|mut request| {
            f(&mut request)?;
            Ok(request)
        });
        self
    }

    /// Add a `Header` to this Request.
    pub fn header<K, V>(self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.map(|request| {
            let name = HeaderName::try_from(key).map_err(builder_error)?;
            let value = HeaderValue::try_from(value).map_err(builder_error)?;
            request.headers.append(name, value);
            Ok(())
        })
    }

    /// Add a set of Headers to the existing ones on this Request.
    pub fn headers(self, headers: HeaderMap) -> Self {
        self.map(|request| {
            request.headers.extend(headers);
            Ok(())
        })
    }

    /// Set the request body.
    pub fn body<T: Into<Bytes>>(self, body: T) -> Self {
        self.map(|request| {
            request.body = body.into();
            Ok(())
        })
    }

    /// Send a JSON body.
    ///
    /// # Errors
    ///
    /// Serialization can fail if `T`'s implementation of `Serialize` decides to
    /// fail, or if `T` contains a map with non-string keys.
    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> Self {
        self.map(|request| {
            request.body = serde_json::to_vec(json)
                .map_err(|err| ClientError::new(ErrorKind::Builder, Some(Box::new(err))))?
                .into();
            if !request.headers.contains_key(CONTENT_TYPE) {
                request
                    .headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            Ok(())
        })
    }

    /// Add a Redact instruction.
    ///
    /// Instructs the prover on which parts of the request and response to
    /// hide from the proof, e.g. `"res:body:dolor"`. The instruction is
    /// opaque to the client. Setting it again replaces the previous one.
    pub fn redact(self, redact: impl Into<String>) -> Self {
        self.map(|request| {
            let redact = redact.into();
            header_value(&redact)?;
            request.redact = Some(redact);
            Ok(())
        })
    }

    /// Add an instruction to prove a failed request.
    ///
    /// Instructs the prover to prove the response even if its status code is
    /// not success. Without it no proof is awaited for such responses.
    pub fn prove_failed_request(self) -> Self {
        self.map(|request| {
            request.prove_failed_request = true;
            Ok(())
        })
    }

    /// Fail the request if no proof could be obtained, overriding the client
    /// default.
    pub fn throw_on_error(self, throw_on_error: bool) -> Self {
        self.map(|request| {
            request.policy.throw_on_error = throw_on_error;
            Ok(())
        })
    }

    /// Set how long to wait for the proof, overriding the client default.
    pub fn proof_timeout(self, timeout: Duration) -> Self {
        self.map(|request| {
            request.policy.proof_timeout = timeout;
            Ok(())
        })
    }

    /// Set how long to hold the request back while the proof channel is
    /// being opened, overriding the client default.
    pub fn gate_timeout(self, timeout: Duration) -> Self {
        self.map(|request| {
            request.policy.gate_timeout = timeout;
            Ok(())
        })
    }

    /// Build a `ProxyRequest`, which can be inspected and executed with
    /// [`VerityClient::execute`].
    pub fn build(self) -> Result<ProxyRequest, ClientError> {
        self.request
    }

    /// Build a `ProxyRequest`, also returning the embedded `VerityClient`.
    pub fn build_split(self) -> (VerityClient, Result<ProxyRequest, ClientError>) {
        (self.client, self.request)
    }

    /// Sends the request through the prover and waits for both the response
    /// and its proof.
    ///
    /// # Errors
    ///
    /// This method fails if the request could not be built or sent, and if
    /// no proof could be obtained while `throw_on_error` is set.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use verity_client::{ClientError, VerityClient, VerityClientConfig};
    /// # async fn run() -> Result<(), ClientError> {
    /// let config = VerityClientConfig::builder()
    ///     .prover_url("http://127.0.0.1:8080")
    ///     .build()?;
    ///
    /// let response = VerityClient::new(config)
    ///     .get("https://jsonplaceholder.typicode.com/posts/98")
    ///     .redact("res:body:dolor")
    ///     .send()
    ///     .await?;
    ///
    /// if let Some(proof) = &response.proof {
    ///     println!("proof length: {}", proof.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send(self) -> Result<VerityResponse, ClientError> {
        let (client, request) = self.build_split();
        client.execute(request?).await
    }
}

impl IntoFuture for RequestBuilder {
    type Output = Result<VerityResponse, ClientError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.send())
    }
}
