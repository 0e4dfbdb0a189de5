//! Verity client library.
//!
//! Proxies HTTP requests through a verity prover and attaches the proof the
//! prover produces for each exchange to the response.

#![deny(missing_docs, unreachable_pub, unused_must_use)]
#![deny(clippy::all)]
#![forbid(unsafe_code)]

mod channel;
mod client;
mod config;
mod error;
mod gate;
#[cfg(test)]
mod mock;
mod request;
mod request_id;
mod response;
mod sse;
mod subscription;
mod transport;

pub use channel::{ChannelError, ChannelEvent, ChannelOpener, ProofChannel};
pub use client::VerityClient;
pub use crate::config::{
    ProofPolicy, VerityClientConfig, VerityClientConfigBuilder, DEFAULT_GATE_TIMEOUT_MS,
    DEFAULT_PROOF_TIMEOUT_MS,
};
pub use error::ClientError;
pub use request::{ProxyRequest, RequestBuilder};
pub use request_id::RequestId;
pub use response::VerityResponse;
pub use sse::EventStreamOpener;
pub use subscription::{ProofSubscription, SubscriptionOutcome};
pub use transport::{HyperTransport, Transport};
pub use verity_common::{NotaryInformation, ProofPayload};
