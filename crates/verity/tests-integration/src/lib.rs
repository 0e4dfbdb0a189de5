//! Helpers for running the verity client against a local prover fixture.

use std::{io, net::SocketAddr};

use tokio::net::TcpListener;
use tracing::debug;
use verity_prover_fixture::{ProofMode, ProverFixture};

/// Prover fixture serving on a random local port.
pub struct RunningProver {
    pub addr: SocketAddr,
    pub fixture: ProverFixture,
}

impl RunningProver {
    /// Base URL of the prover.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Starts a prover fixture in the background.
pub async fn start_prover(mode: ProofMode) -> io::Result<RunningProver> {
    let _ = tracing_subscriber::fmt::try_init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let fixture = ProverFixture::new(mode);

    tokio::spawn(fixture.clone().serve(listener));
    debug!("Prover fixture started on {addr}");

    Ok(RunningProver { addr, fixture })
}

/// Returns the address of a local port nothing listens on.
pub async fn closed_port() -> io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    listener.local_addr()
}
