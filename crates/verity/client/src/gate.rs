use std::time::Duration;
use tokio::{sync::watch, time::timeout};
use tracing::debug;

/// Waits until `ready` flips to `true`, for at most `gate_timeout`.
///
/// Returns whether readiness was observed. Never fails: the caller proceeds on
/// timeout, and also if the sender went away without signalling readiness.
pub(crate) async fn wait_until_ready(
    ready: &mut watch::Receiver<bool>,
    gate_timeout: Duration,
) -> bool {
    match timeout(gate_timeout, ready.wait_for(|ready| *ready)).await {
        Ok(Ok(_)) => true,
        Ok(Err(_)) => {
            debug!("Proof channel terminated before it was ready");
            false
        }
        Err(_) => {
            debug!("Proof channel not ready after {:?}, proceeding", gate_timeout);
            false
        }
    }
}
