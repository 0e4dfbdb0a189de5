use bytes::Bytes;
use hyper::{HeaderMap, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    config::ProofPolicy,
    error::{ClientError, ErrorKind},
    subscription::SubscriptionOutcome,
};

/// Response to a proxied request, together with its proof if one was
/// obtained.
#[derive(Debug)]
pub struct VerityResponse {
    /// The response returned by the target, as relayed by the prover.
    pub subject: Response<Bytes>,
    /// Public key of the notary which signed the proof.
    pub notary_pub_key: Option<String>,
    /// The proof.
    pub proof: Option<String>,
}

impl VerityResponse {
    fn without_proof(subject: Response<Bytes>) -> Self {
        Self {
            subject,
            notary_pub_key: None,
            proof: None,
        }
    }

    /// Returns the status of the relayed response.
    pub fn status(&self) -> StatusCode {
        self.subject.status()
    }

    /// Returns the headers of the relayed response.
    pub fn headers(&self) -> &HeaderMap {
        self.subject.headers()
    }

    /// Returns the body of the relayed response.
    pub fn body(&self) -> &Bytes {
        self.subject.body()
    }

    /// Returns `true` if a proof is attached.
    pub fn has_proof(&self) -> bool {
        self.proof.is_some()
    }

    /// Deserializes the body of the relayed response as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(self.subject.body())
            .map_err(|err| ClientError::new(ErrorKind::Internal, Some(Box::new(err))))
    }
}

/// Attaches the outcome of a proof subscription to a response.
///
/// A delivered payload is split into the notary key and the proof. Any other
/// outcome fails if `policy.throw_on_error` is set, and yields the response
/// without a proof otherwise. A cancelled subscription never fails: it means
/// no proof was expected.
pub(crate) fn compose(
    subject: Response<Bytes>,
    outcome: SubscriptionOutcome,
    policy: &ProofPolicy,
) -> Result<VerityResponse, ClientError> {
    let err = match outcome {
        SubscriptionOutcome::Delivered(payload) if !payload.is_empty() => {
            let (notary_pub_key, proof) = payload.split();
            return Ok(VerityResponse {
                notary_pub_key: Some(notary_pub_key.to_string()),
                proof: Some(proof.to_string()),
                subject,
            });
        }
        SubscriptionOutcome::Cancelled => return Ok(VerityResponse::without_proof(subject)),
        SubscriptionOutcome::Delivered(_) => ClientError::new(
            ErrorKind::ProofUnavailable,
            Some("Prover delivered an empty proof".into()),
        ),
        SubscriptionOutcome::TimedOut => ClientError::new(
            ErrorKind::ProofTimeout,
            Some("Timed out while waiting for a proof".into()),
        ),
        SubscriptionOutcome::StreamError(err) => {
            ClientError::new(ErrorKind::ProofStream, Some(Box::new(err)))
        }
        SubscriptionOutcome::Unavailable(err) => {
            ClientError::new(ErrorKind::ProofUnavailable, Some(Box::new(err)))
        }
    };

    if policy.throw_on_error {
        warn!("Failed to obtain a proof: {err}");
        Err(err)
    } else {
        debug!("Returning response without proof: {err}");
        Ok(VerityResponse::without_proof(subject))
    }
}
