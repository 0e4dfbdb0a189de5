use config::{Config, Environment};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ClientError, ErrorKind};

/// Default upper bound on waiting for a proof once the proof channel is open.
pub const DEFAULT_PROOF_TIMEOUT_MS: u64 = 30_000;
/// Default upper bound on waiting for the proof channel before dispatching.
pub const DEFAULT_GATE_TIMEOUT_MS: u64 = 100;

const ENV_PREFIX: &str = "VERITY";

/// Configuration of a [`VerityClient`](crate::VerityClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(build_fn(validate = "Self::validate", error = "ClientError"))]
pub struct VerityClientConfig {
    /// Base URL of the prover, e.g. "http://127.0.0.1:8080".
    #[builder(setter(into))]
    prover_url: String,
    /// Fail requests whose proof could not be obtained instead of returning
    /// them without a proof.
    #[builder(default)]
    #[serde(default)]
    throw_on_error: bool,
    /// Milliseconds to wait for a proof after the proof channel is open.
    #[builder(default = "DEFAULT_PROOF_TIMEOUT_MS")]
    #[serde(default = "default_proof_timeout_ms")]
    proof_timeout_ms: u64,
    /// Milliseconds to hold a request back while the proof channel is being
    /// opened.
    #[builder(default = "DEFAULT_GATE_TIMEOUT_MS")]
    #[serde(default = "default_gate_timeout_ms")]
    gate_timeout_ms: u64,
}

impl VerityClientConfigBuilder {
    fn validate(&self) -> Result<(), ClientError> {
        match &self.prover_url {
            Some(url) => validate_prover_url(url),
            None => Ok(()),
        }
    }
}

impl VerityClientConfig {
    /// Creates a new builder for `VerityClientConfig`.
    pub fn builder() -> VerityClientConfigBuilder {
        VerityClientConfigBuilder::default()
    }

    /// Loads the configuration from `VERITY_*` environment variables, e.g.
    /// `VERITY_PROVER_URL` and `VERITY_PROOF_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(environment: Environment) -> Result<Self, ClientError> {
        let config: Self = Config::builder()
            .add_source(
                environment
                    .try_parsing(true)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|err| ClientError::new(ErrorKind::Configuration, Some(Box::new(err))))?;

        validate_prover_url(&config.prover_url)?;

        Ok(config)
    }

    /// Returns the base URL of the prover.
    pub fn prover_url(&self) -> &str {
        self.prover_url.trim_end_matches('/')
    }

    /// Returns the proof policy applied to requests by default.
    pub fn policy(&self) -> ProofPolicy {
        ProofPolicy {
            throw_on_error: self.throw_on_error,
            proof_timeout: Duration::from_millis(self.proof_timeout_ms),
            gate_timeout: Duration::from_millis(self.gate_timeout_ms),
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.prover_url())
    }
}

/// How long to wait for a proof, and what to do when none arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofPolicy {
    /// Fail the request if no proof could be obtained.
    pub throw_on_error: bool,
    /// Upper bound on waiting for the proof once the channel is open.
    pub proof_timeout: Duration,
    /// Upper bound on waiting for the channel to open before dispatching.
    pub gate_timeout: Duration,
}

impl Default for ProofPolicy {
    fn default() -> Self {
        Self {
            throw_on_error: false,
            proof_timeout: Duration::from_millis(DEFAULT_PROOF_TIMEOUT_MS),
            gate_timeout: Duration::from_millis(DEFAULT_GATE_TIMEOUT_MS),
        }
    }
}

fn default_proof_timeout_ms() -> u64 {
    DEFAULT_PROOF_TIMEOUT_MS
}

fn default_gate_timeout_ms() -> u64 {
    DEFAULT_GATE_TIMEOUT_MS
}

fn validate_prover_url(url: &str) -> Result<(), ClientError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ClientError::new(
            ErrorKind::Configuration,
            Some(format!("Prover url must be an http(s) url, got {url:?}").into()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_builder_defaults() {
        let config = VerityClientConfig::builder()
            .prover_url("http://127.0.0.1:8080/")
            .build()
            .unwrap();

        assert_eq!(config.prover_url(), "http://127.0.0.1:8080");
        assert_eq!(config.endpoint("/proxy"), "http://127.0.0.1:8080/proxy");
        assert_eq!(config.policy(), ProofPolicy::default());
    }

    #[test]
    fn test_builder_rejects_missing_or_invalid_url() {
        let err = VerityClientConfig::builder().build().unwrap_err();
        assert!(err.is_builder());

        let err = VerityClientConfig::builder()
            .prover_url("127.0.0.1:8080")
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_from_environment() {
        let vars = HashMap::from([
            (
                "VERITY_PROVER_URL".to_string(),
                "http://prover:8080".to_string(),
            ),
            ("VERITY_THROW_ON_ERROR".to_string(), "true".to_string()),
            ("VERITY_PROOF_TIMEOUT_MS".to_string(), "5000".to_string()),
        ]);

        let config = VerityClientConfig::from_environment(
            Environment::with_prefix(ENV_PREFIX).source(Some(vars)),
        )
        .unwrap();

        let policy = config.policy();
        assert_eq!(config.prover_url(), "http://prover:8080");
        assert!(policy.throw_on_error);
        assert_eq!(policy.proof_timeout, Duration::from_millis(5000));
        assert_eq!(
            policy.gate_timeout,
            Duration::from_millis(DEFAULT_GATE_TIMEOUT_MS)
        );
    }

    #[test]
    fn test_from_environment_requires_prover_url() {
        let err = VerityClientConfig::from_environment(
            Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::new())),
        )
        .unwrap_err();

        assert!(err.is_configuration());
    }
}
