//! Proof channel capability.
//!
//! The prover pushes proofs over a server-initiated event stream. How that
//! stream is opened is injected into the client through [`ChannelOpener`],
//! so that the client never needs to know which push mechanism the current
//! environment provides.

use futures::stream::BoxStream;
use hyper::StatusCode;
use std::error::Error;

/// An event observed on a proof channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel is established and listening.
    Open,
    /// A message was pushed by the prover.
    Message(String),
}

/// A lazily connecting proof channel.
///
/// The channel is closed when the stream is dropped.
pub type ProofChannel = BoxStream<'static, Result<ChannelEvent, ChannelError>>;

/// Opens proof channels.
pub trait ChannelOpener: Send + Sync {
    /// Opens a channel to the given URL.
    ///
    /// Returns an error if no channel can be constructed at all. Errors
    /// occurring after construction are reported through the stream.
    fn open(&self, url: &str) -> Result<ProofChannel, ChannelError>;
}

/// Errors reported by a proof channel.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum ChannelError {
    #[error("invalid proof channel url: {0}")]
    InvalidUrl(String),
    #[error("proof channel connection failed: {0}")]
    Connection(#[source] Box<dyn Error + Send + Sync>),
    #[error("proof channel responded with status {0}")]
    Status(StatusCode),
    #[error("proof channel responded with content type {0:?}")]
    ContentType(Option<String>),
    #[error("proof channel closed before a proof was delivered")]
    Closed,
}
