use std::env;

use tokio::net::TcpListener;
use verity_prover_fixture::{ProofMode, ProverFixture, DEFAULT_FIXTURE_PORT};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let addr = env::var("ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = match env::var("PORT") {
        Ok(port) => port.parse()?,
        Err(_) => DEFAULT_FIXTURE_PORT,
    };
    let mode = match env::var("PROOF_MODE").as_deref() {
        Ok("never") => ProofMode::Never,
        Ok("close") => ProofMode::Close,
        Ok("not-found") => ProofMode::NotFound,
        Ok("plain-text") => ProofMode::PlainText,
        _ => ProofMode::Prove,
    };

    let listener = TcpListener::bind((addr, port)).await?;
    ProverFixture::new(mode).serve(listener).await
}
