//! In-memory transport and proof channels for unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{channel::mpsc, StreamExt as _};
use http_body_util::{BodyExt as _, Full};
use hyper::{http::request::Parts, Request, Response, StatusCode};
use std::sync::{Arc, Mutex};

use crate::{
    channel::{ChannelError, ChannelEvent, ChannelOpener, ProofChannel},
    error::{ClientError, ErrorKind},
    transport::Transport,
};

/// Records the order in which mock capabilities were used.
pub(crate) type EventLog = Arc<Mutex<Vec<&'static str>>>;

/// Test side of a mock proof channel.
#[derive(Clone)]
pub(crate) struct MockChannel {
    sender: mpsc::UnboundedSender<Result<ChannelEvent, ChannelError>>,
}

impl MockChannel {
    pub(crate) fn open(&self) {
        let _ = self.sender.unbounded_send(Ok(ChannelEvent::Open));
    }

    pub(crate) fn deliver(&self, data: &str) {
        let _ = self
            .sender
            .unbounded_send(Ok(ChannelEvent::Message(data.to_string())));
    }

    pub(crate) fn fail(&self) {
        let _ = self.sender.unbounded_send(Err(ChannelError::Connection(
            "connection reset".into(),
        )));
    }

    pub(crate) fn end(&self) {
        self.sender.close_channel();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub(crate) async fn wait_closed(&self) {
        while !self.is_closed() {
            tokio::task::yield_now().await;
        }
    }
}

#[derive(Default)]
struct OpenerState {
    opened: Vec<String>,
    channels: Vec<MockChannel>,
}

/// Opens in-memory proof channels driven by the test.
#[derive(Clone, Default)]
pub(crate) struct MockChannelOpener {
    state: Arc<Mutex<OpenerState>>,
    auto_open: bool,
    log: Option<EventLog>,
}

impl MockChannelOpener {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Channels report that they are open as soon as they are created.
    pub(crate) fn auto_open(mut self) -> Self {
        self.auto_open = true;
        self
    }

    pub(crate) fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Returns the most recently opened channel.
    pub(crate) fn channel(&self) -> MockChannel {
        self.state
            .lock()
            .unwrap()
            .channels
            .last()
            .cloned()
            .expect("no channel was opened")
    }

    pub(crate) fn channels(&self) -> Vec<MockChannel> {
        self.state.lock().unwrap().channels.clone()
    }

    pub(crate) fn opened(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }
}

impl ChannelOpener for MockChannelOpener {
    fn open(&self, url: &str) -> Result<ProofChannel, ChannelError> {
        if let Some(log) = &self.log {
            log.lock().unwrap().push("open");
        }

        let (sender, receiver) = mpsc::unbounded();
        let channel = MockChannel { sender };
        if self.auto_open {
            channel.open();
        }

        let mut state = self.state.lock().unwrap();
        state.opened.push(url.to_string());
        state.channels.push(channel);

        Ok(receiver.boxed())
    }
}

/// Opener for an environment without any push mechanism.
pub(crate) struct UnavailableOpener;

impl ChannelOpener for UnavailableOpener {
    fn open(&self, _url: &str) -> Result<ProofChannel, ChannelError> {
        Err(ChannelError::Connection(
            "no event stream support in this environment".into(),
        ))
    }
}

/// A request as seen by the mock transport.
pub(crate) struct RecordedRequest {
    pub(crate) parts: Parts,
    pub(crate) body: Bytes,
}

struct TransportState {
    requests: Vec<RecordedRequest>,
    status: StatusCode,
    body: Bytes,
    fail: bool,
}

/// Transport answering every request locally.
#[derive(Clone)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<TransportState>>,
    on_send: Option<Arc<dyn Fn() + Send + Sync>>,
    log: Option<EventLog>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TransportState {
                requests: Vec::new(),
                status: StatusCode::OK,
                body: Bytes::from_static(b"ok"),
                fail: false,
            })),
            on_send: None,
            log: None,
        }
    }

    pub(crate) fn with_status(self, status: StatusCode) -> Self {
        self.state.lock().unwrap().status = status;
        self
    }

    pub(crate) fn with_body(self, body: &'static str) -> Self {
        self.state.lock().unwrap().body = Bytes::from_static(body.as_bytes());
        self
    }

    /// Every request fails at the transport level.
    pub(crate) fn failing(self) -> Self {
        self.state.lock().unwrap().fail = true;
        self
    }

    /// Runs `hook` while a request is in flight, e.g. to push its proof.
    pub(crate) fn on_send(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_send = Some(Arc::new(hook));
        self
    }

    pub(crate) fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub(crate) fn take_requests(&self) -> Vec<RecordedRequest> {
        std::mem::take(&mut self.state.lock().unwrap().requests)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request<Full<Bytes>>) -> Result<Response<Bytes>, ClientError> {
        if let Some(log) = &self.log {
            log.lock().unwrap().push("send");
        }

        let (parts, body) = request.into_parts();
        let body = body.collect().await.unwrap().to_bytes();

        if let Some(hook) = &self.on_send {
            hook();
        }

        let mut state = self.state.lock().unwrap();
        state.requests.push(RecordedRequest { parts, body });

        if state.fail {
            return Err(ClientError::new(
                ErrorKind::Http,
                Some("connection refused".into()),
            ));
        }

        Ok(Response::builder()
            .status(state.status)
            .body(state.body.clone())
            .unwrap())
    }
}
