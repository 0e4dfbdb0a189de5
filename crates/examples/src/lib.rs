use std::env;

use tracing_subscriber::EnvFilter;
use verity_client::{ClientError, VerityClientConfig};

/// Prover used when `VERITY_PROVER_URL` is not set.
pub const DEFAULT_PROVER_URL: &str = "http://127.0.0.1:8080";

/// Installs a fmt subscriber honouring `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Loads the client configuration from `VERITY_*` environment variables,
/// falling back to a local prover.
pub fn client_config() -> Result<VerityClientConfig, ClientError> {
    if env::var("VERITY_PROVER_URL").is_ok() {
        return VerityClientConfig::from_env();
    }

    VerityClientConfig::builder()
        .prover_url(DEFAULT_PROVER_URL)
        .build()
}
