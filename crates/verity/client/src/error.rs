//! Verity client errors.
//!
//! Failures of the proxied HTTP exchange and failures of the proof side
//! channel are both reported through [`ClientError`]; the predicates tell
//! them apart.

use derive_builder::UninitializedFieldError;
use std::{error::Error, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub(crate) enum ErrorKind {
    Internal,
    Builder,
    Configuration,
    Http,
    ProofTimeout,
    ProofStream,
    ProofUnavailable,
}

#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub struct ClientError {
    kind: ErrorKind,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl ClientError {
    pub(crate) fn new(kind: ErrorKind, source: Option<Box<dyn Error + Send + Sync>>) -> Self {
        Self { kind, source }
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` if the proxied HTTP exchange itself failed.
    pub fn is_http(&self) -> bool {
        self.kind == ErrorKind::Http
    }

    /// Returns `true` if the request could not be built.
    pub fn is_builder(&self) -> bool {
        self.kind == ErrorKind::Builder
    }

    /// Returns `true` if the client configuration is invalid.
    pub fn is_configuration(&self) -> bool {
        self.kind == ErrorKind::Configuration
    }

    /// Returns `true` if the request succeeded but no proof could be
    /// obtained for it.
    pub fn is_proof(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::ProofTimeout | ErrorKind::ProofStream | ErrorKind::ProofUnavailable
        )
    }

    /// Returns `true` if no proof arrived before the proof timeout.
    pub fn is_proof_timeout(&self) -> bool {
        self.kind == ErrorKind::ProofTimeout
    }

    /// Returns `true` if the proof channel failed.
    pub fn is_proof_stream(&self) -> bool {
        self.kind == ErrorKind::ProofStream
    }

    /// Returns `true` if the proof channel could not be opened or the prover
    /// delivered an empty proof.
    pub fn is_proof_unavailable(&self) -> bool {
        self.kind == ErrorKind::ProofUnavailable
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "client error: {:?}, source: {:?}",
            self.kind, self.source
        )
    }
}

impl From<UninitializedFieldError> for ClientError {
    fn from(ufe: UninitializedFieldError) -> Self {
        ClientError::new(ErrorKind::Builder, Some(Box::new(ufe)))
    }
}
