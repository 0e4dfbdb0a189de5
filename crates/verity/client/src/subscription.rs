//! Proof subscription.
//!
//! A subscription owns the proof channel of exactly one request. It runs on
//! its own task so that it progresses independently of the proxied HTTP
//! exchange, publishes readiness as soon as the channel is open, and resolves
//! to exactly one [`SubscriptionOutcome`].

use futures::StreamExt as _;
use std::time::Duration;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{timeout_at, Instant},
};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, debug_span, error, warn, Instrument as _};
use verity_common::ProofPayload;

use crate::{
    channel::{ChannelError, ChannelEvent, ChannelOpener, ProofChannel},
    gate,
};

/// How a proof subscription ended.
#[derive(Debug)]
pub enum SubscriptionOutcome {
    /// The prover pushed a payload.
    Delivered(ProofPayload),
    /// No payload arrived before the proof timeout.
    TimedOut,
    /// The channel failed or closed before delivering a payload.
    StreamError(ChannelError),
    /// The channel could not be constructed.
    Unavailable(ChannelError),
    /// The subscription was closed by the client before any other outcome.
    Cancelled,
}

impl SubscriptionOutcome {
    fn name(&self) -> &'static str {
        match self {
            SubscriptionOutcome::Delivered(_) => "delivered",
            SubscriptionOutcome::TimedOut => "timed out",
            SubscriptionOutcome::StreamError(_) => "stream error",
            SubscriptionOutcome::Unavailable(_) => "unavailable",
            SubscriptionOutcome::Cancelled => "cancelled",
        }
    }
}

/// Handle to a running proof subscription.
///
/// Dropping the handle closes the subscription.
#[derive(Debug)]
pub struct ProofSubscription {
    ready: watch::Receiver<bool>,
    cancel: CancellationToken,
    task: JoinHandle<SubscriptionOutcome>,
    _guard: DropGuard,
}

impl ProofSubscription {
    /// Opens a subscription to the proof channel at `url`.
    ///
    /// `proof_timeout` bounds the wait for a payload, counted from the moment
    /// the channel reports that it is open. Must be called from within a
    /// tokio runtime.
    pub fn open(opener: &dyn ChannelOpener, url: &str, proof_timeout: Duration) -> Self {
        let (ready_sender, ready) = watch::channel(false);
        let cancel = CancellationToken::new();

        let channel = opener.open(url);
        let task = tokio::spawn(
            run(channel, ready_sender, cancel.clone(), proof_timeout)
                .instrument(debug_span!("proof_subscription", url)),
        );

        Self {
            ready,
            _guard: cancel.clone().drop_guard(),
            cancel,
            task,
        }
    }

    /// Returns `true` once the channel has reported that it is open.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Waits for the channel to be open, for at most `gate_timeout`.
    ///
    /// Returns whether the channel is ready. Never fails.
    pub async fn wait_ready(&mut self, gate_timeout: Duration) -> bool {
        gate::wait_until_ready(&mut self.ready, gate_timeout).await
    }

    /// Closes the subscription. Closing more than once has no effect, and so
    /// does closing a subscription which already ended.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Waits for the outcome of the subscription.
    pub async fn outcome(self) -> SubscriptionOutcome {
        let Self {
            task, _guard: guard, ..
        } = self;

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Proof subscription task failed");
                SubscriptionOutcome::StreamError(ChannelError::Connection(Box::new(err)))
            }
        };
        drop(guard);

        outcome
    }
}

async fn run(
    channel: Result<ProofChannel, ChannelError>,
    ready: watch::Sender<bool>,
    cancel: CancellationToken,
    proof_timeout: Duration,
) -> SubscriptionOutcome {
    let mut channel = match channel {
        Ok(channel) => channel,
        Err(err) => {
            warn!("Proof channel is unavailable in this environment: {err}");
            return SubscriptionOutcome::Unavailable(err);
        }
    };

    let mut deadline = deadline_after(proof_timeout);
    let outcome = loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            event = timeout_at(deadline, channel.next()) => Some(event),
        };

        let Some(event) = event else {
            break SubscriptionOutcome::Cancelled;
        };

        match event {
            Err(_) => break SubscriptionOutcome::TimedOut,
            Ok(Some(Ok(ChannelEvent::Open))) => {
                debug!("Proof channel is open");
                deadline = deadline_after(proof_timeout);
                ready.send_replace(true);
            }
            Ok(Some(Ok(ChannelEvent::Message(data)))) => {
                break SubscriptionOutcome::Delivered(ProofPayload::new(data))
            }
            Ok(Some(Err(err))) => {
                debug!("Proof channel failed: {err}");
                break SubscriptionOutcome::StreamError(err);
            }
            Ok(None) => break SubscriptionOutcome::StreamError(ChannelError::Closed),
        }
    };

    drop(channel);
    debug!("Proof channel closed, outcome: {}", outcome.name());

    outcome
}

// Saturates for timeouts too large to represent, e.g. `Duration::MAX`.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Roughly 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);
