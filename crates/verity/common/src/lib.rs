//! Types and constants shared between the verity client and prover
//! implementations.

#![deny(missing_docs, unreachable_pub, unused_must_use)]
#![deny(clippy::all)]
#![forbid(unsafe_code)]

mod payload;

pub use payload::ProofPayload;

use serde::{Deserialize, Serialize};

/// Header carrying the per-request correlation identifier.
pub const REQUEST_ID_HEADER: &str = "T-REQUEST-ID";
/// Header carrying the URL the prover should forward the request to.
pub const PROXY_URL_HEADER: &str = "T-PROXY-URL";
/// Header carrying the redaction instruction, if any.
pub const REDACTED_HEADER: &str = "T-REDACTED";
/// Header instructing the prover to prove non-success responses too.
pub const PROVE_FAILED_REQ_HEADER: &str = "T-PROVE-FAILED-REQ";

/// Path of the prover's proxy ingress.
pub const PROXY_PATH: &str = "/proxy";
/// Path prefix of the proof event stream, followed by the request id.
pub const PROOF_PATH: &str = "/proof";
/// Path of the notary information endpoint.
pub const NOTARY_INFO_PATH: &str = "/notaryinfo";

/// Response object of the /notaryinfo API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotaryInformation {
    /// Version of the prover.
    pub version: String,
    /// Public key of the notary signing key, PEM encoded.
    pub public_key: String,
    /// Git commit hash the prover was built from.
    pub git_commit_hash: String,
    /// Timestamp of that commit.
    pub git_commit_timestamp: String,
}
