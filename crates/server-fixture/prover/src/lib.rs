//! A stand-in for a verity prover, for tests and examples.
//!
//! The fixture never contacts the target: `/proxy` answers every request
//! itself and publishes a fake proof on `/proof/{id}`.

use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Json, Response,
    },
    routing::{any, get},
    Router,
};
use futures::{stream, stream::BoxStream, StreamExt};
use tokio::{net::TcpListener, sync::watch};
use tracing::{debug, info};
use verity_common::{
    NotaryInformation, ProofPayload, NOTARY_INFO_PATH, PROVE_FAILED_REQ_HEADER, PROXY_PATH,
    PROXY_URL_HEADER, REDACTED_HEADER, REQUEST_ID_HEADER,
};

pub const DEFAULT_FIXTURE_PORT: u16 = 3000;

/// How long a published proof waits for its subscriber.
pub const PROOF_RETENTION: Duration = Duration::from_secs(30);

/// Public key the fixture claims to be notarized with.
pub const FIXTURE_NOTARY_PUB_KEY: &str = concat!(
    "-----BEGIN PUBLIC KEY-----\n",
    "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEfixture\n",
    "-----END PUBLIC KEY-----"
);

/// How the fixture answers proof subscriptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProofMode {
    /// Push `<key>|proof-for-<id>` once the request was proxied.
    #[default]
    Prove,
    /// Keep the stream open without ever pushing a proof.
    Never,
    /// Close the stream without pushing a proof.
    Close,
    /// Answer proof subscriptions with `404 Not Found`.
    NotFound,
    /// Answer proof subscriptions with a plain text body instead of an event
    /// stream.
    PlainText,
}

/// A request received on the proxy ingress.
#[derive(Debug, Clone)]
pub struct ProxiedRequest {
    pub request_id: String,
    pub method: Method,
    pub target_url: String,
    pub redacted: Option<String>,
    pub prove_failed_request: bool,
    pub body: Bytes,
}

struct FixtureState {
    mode: ProofMode,
    proofs: Mutex<HashMap<String, watch::Sender<Option<String>>>>,
    requests: Mutex<Vec<ProxiedRequest>>,
}

impl FixtureState {
    fn subscribe(self: &Arc<Self>, id: &str) -> (watch::Receiver<Option<String>>, SlotGuard) {
        let receiver = self
            .proofs
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .subscribe();

        let guard = SlotGuard {
            state: self.clone(),
            id: id.to_string(),
        };

        (receiver, guard)
    }

    /// Publishes the proof for `id`, keeping it for a subscriber for at most
    /// [`PROOF_RETENTION`].
    fn publish(self: &Arc<Self>, id: &str, proof: String) {
        self.proofs
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .send_replace(Some(proof));

        let state = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(PROOF_RETENTION).await;
            state.forget(&id);
        });
    }

    fn forget(&self, id: &str) {
        self.proofs.lock().unwrap().remove(id);
    }
}

/// Drops the proof slot of a subscriber once its stream is gone.
struct SlotGuard {
    state: Arc<FixtureState>,
    id: String,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.state.forget(&self.id);
    }
}

/// Handle to a prover fixture.
///
/// Clones share the recorded requests and pending proofs.
#[derive(Clone)]
pub struct ProverFixture {
    state: Arc<FixtureState>,
}

impl Default for ProverFixture {
    fn default() -> Self {
        Self::new(ProofMode::default())
    }
}

impl ProverFixture {
    pub fn new(mode: ProofMode) -> Self {
        Self {
            state: Arc::new(FixtureState {
                mode,
                proofs: Mutex::default(),
                requests: Mutex::default(),
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(NOTARY_INFO_PATH, get(notary_info))
            .route(PROXY_PATH, any(proxy))
            .route("/proof/{id}", get(proof))
            .with_state(self.state.clone())
    }

    /// Returns the requests proxied so far.
    pub fn requests(&self) -> Vec<ProxiedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Serves the fixture on `listener` until the task is dropped.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        info!("Prover fixture listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

pub fn notary_information() -> NotaryInformation {
    NotaryInformation {
        version: "0.0.0".to_string(),
        public_key: FIXTURE_NOTARY_PUB_KEY.to_string(),
        git_commit_hash: "0000000000000000000000000000000000000000".to_string(),
        git_commit_timestamp: "0".to_string(),
    }
}

async fn notary_info() -> Json<NotaryInformation> {
    Json(notary_information())
}

async fn proxy(
    State(state): State<Arc<FixtureState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    let (Some(request_id), Some(target_url)) =
        (header(REQUEST_ID_HEADER), header(PROXY_URL_HEADER))
    else {
        return (StatusCode::BAD_REQUEST, "missing proxy headers").into_response();
    };

    let request = ProxiedRequest {
        request_id: request_id.clone(),
        method: method.clone(),
        redacted: header(REDACTED_HEADER),
        prove_failed_request: header(PROVE_FAILED_REQ_HEADER).as_deref() == Some("true"),
        target_url: target_url.clone(),
        body: body.clone(),
    };
    debug!("Proxying {} {} as {}", method, target_url, request_id);

    let status = target_status(&target_url);
    if status.is_success() || request.prove_failed_request {
        let payload =
            ProofPayload::from_parts(FIXTURE_NOTARY_PUB_KEY, &format!("proof-for-{request_id}"));
        state.publish(&request_id, payload.to_string());
    }
    state.requests.lock().unwrap().push(request);

    let echo = serde_json::json!({
        "method": method.as_str(),
        "url": target_url,
        "body": String::from_utf8_lossy(&body),
    });

    (status, Json(echo)).into_response()
}

async fn proof(State(state): State<Arc<FixtureState>>, Path(id): Path<String>) -> Response {
    let events: BoxStream<'static, Result<Event, Infallible>> = match state.mode {
        ProofMode::Prove => {
            let (mut slot, guard) = state.subscribe(&id);
            stream::once(async move {
                let proof = match slot.wait_for(Option::is_some).await {
                    Ok(proof) => proof.clone().unwrap_or_default(),
                    Err(_) => String::new(),
                };
                drop(guard);
                Ok(Event::default().data(proof))
            })
            .boxed()
        }
        ProofMode::Never => stream::pending().boxed(),
        ProofMode::Close => stream::empty().boxed(),
        ProofMode::NotFound => return StatusCode::NOT_FOUND.into_response(),
        ProofMode::PlainText => return "no proofs here".into_response(),
    };

    Sse::new(events).into_response()
}

/// Targets of the form `.../status/<code>` answer with `<code>`.
fn target_status(url: &str) -> StatusCode {
    url.rsplit_once("/status/")
        .and_then(|(_, code)| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK)
}
