use std::fmt;

use serde::{Deserialize, Serialize};

const SEPARATOR: char = '|';

/// A proof message as pushed by the prover over the proof event stream.
///
/// The payload is either empty, meaning the prover obtained no proof, or of
/// the form `<notary_public_key>|<proof>`. Only the first separator is
/// significant, the proof itself may contain further `|` characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofPayload(String);

impl ProofPayload {
    /// Wraps a raw payload.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Builds a payload from a notary key and a proof.
    pub fn from_parts(notary_pub_key: &str, proof: &str) -> Self {
        Self(format!("{notary_pub_key}{SEPARATOR}{proof}"))
    }

    /// Returns `true` if the prover delivered no proof.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw payload.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the payload into `(notary_pub_key, proof)`.
    ///
    /// A payload without a separator is treated as a bare proof with an empty
    /// key.
    pub fn split(&self) -> (&str, &str) {
        self.0.split_once(SEPARATOR).unwrap_or(("", self.0.as_str()))
    }
}

impl fmt::Display for ProofPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ProofPayload {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}
