//! Proof channel over `text/event-stream`.

use bytes::Bytes;
use futures::{stream, StreamExt as _};
use http_body_util::{BodyExt as _, Empty};
use hyper::{
    body::Incoming,
    header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE},
    Request, Uri,
};
use hyper_tls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::collections::VecDeque;
use tracing::{debug, error};

use crate::channel::{ChannelError, ChannelEvent, ChannelOpener, ProofChannel};

const EVENT_STREAM_MIME: &str = "text/event-stream";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Opens proof channels as HTTP server-sent event streams.
#[derive(Clone)]
pub struct EventStreamOpener {
    client: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
}

impl EventStreamOpener {
    /// Creates a new opener with its own connection pool.
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build(HttpsConnector::new()),
        }
    }
}

impl Default for EventStreamOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelOpener for EventStreamOpener {
    fn open(&self, url: &str) -> Result<ProofChannel, ChannelError> {
        let uri: Uri = url
            .parse()
            .map_err(|_| ChannelError::InvalidUrl(url.to_string()))?;

        let request = Request::get(uri)
            .header(ACCEPT, EVENT_STREAM_MIME)
            .header(CACHE_CONTROL, "no-cache")
            .body(Empty::new())
            .map_err(|err| ChannelError::Connection(Box::new(err)))?;

        let state = State::Connecting {
            client: self.client.clone(),
            request,
        };

        Ok(stream::unfold(state, next_event).boxed())
    }
}

enum State {
    Connecting {
        client: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
        request: Request<Empty<Bytes>>,
    },
    Streaming {
        body: Incoming,
        decoder: EventStreamDecoder,
    },
    Done,
}

async fn next_event(state: State) -> Option<(Result<ChannelEvent, ChannelError>, State)> {
    match state {
        State::Connecting { client, request } => {
            debug!("Connecting to proof channel: {}", request.uri());

            let response = match client.request(request).await {
                Ok(response) => response,
                Err(err) => {
                    error!("Failed to connect to proof channel");
                    return Some((Err(ChannelError::Connection(Box::new(err))), State::Done));
                }
            };

            if !response.status().is_success() {
                return Some((Err(ChannelError::Status(response.status())), State::Done));
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok());
            if !content_type.is_some_and(|value| value.starts_with(EVENT_STREAM_MIME)) {
                let content_type = content_type.map(str::to_string);
                return Some((Err(ChannelError::ContentType(content_type)), State::Done));
            }

            Some((
                Ok(ChannelEvent::Open),
                State::Streaming {
                    body: response.into_body(),
                    decoder: EventStreamDecoder::default(),
                },
            ))
        }
        State::Streaming {
            mut body,
            mut decoder,
        } => loop {
            if let Some(data) = decoder.next_message() {
                return Some((
                    Ok(ChannelEvent::Message(data)),
                    State::Streaming { body, decoder },
                ));
            }

            match body.frame().await {
                Some(Ok(frame)) => {
                    if let Ok(data) = frame.into_data() {
                        decoder.push(&data);
                    }
                }
                Some(Err(err)) => {
                    return Some((Err(ChannelError::Connection(Box::new(err))), State::Done));
                }
                None => return None,
            }
        },
        State::Done => None,
    }
}

/// Incremental decoder of `text/event-stream` bodies.
///
/// Only the `data` field is kept. Lines of a multi-line event are joined with
/// `\n`, and an event is dispatched on the blank line that terminates it.
#[derive(Debug, Default)]
pub(crate) struct EventStreamDecoder {
    line: Vec<u8>,
    // The previous line ended with `\r`, so a leading `\n` belongs to it.
    skip_lf: bool,
    started: bool,
    data: Option<String>,
    messages: VecDeque<String>,
}

impl EventStreamDecoder {
    /// Feeds a chunk of the body into the decoder.
    ///
    /// Lines may end with `\n`, `\r\n` or a bare `\r`.
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        for &byte in chunk {
            if std::mem::take(&mut self.skip_lf) && byte == b'\n' {
                continue;
            }

            match byte {
                b'\n' => self.end_line(),
                b'\r' => {
                    self.end_line();
                    self.skip_lf = true;
                }
                _ => self.line.push(byte),
            }
        }
    }

    fn end_line(&mut self) {
        let line = std::mem::take(&mut self.line);
        let mut line = line.as_slice();
        if !std::mem::replace(&mut self.started, true) {
            line = line.strip_prefix(UTF8_BOM).unwrap_or(line);
        }
        self.process_line(&String::from_utf8_lossy(line));
    }

    /// Returns the next complete message, if any.
    pub(crate) fn next_message(&mut self) -> Option<String> {
        self.messages.pop_front()
    }

    fn process_line(&mut self, line: &str) {
        if line.is_empty() {
            if let Some(data) = self.data.take() {
                self.messages.push_back(data);
            }
            return;
        }

        // Comment.
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            }
        }
    }
}
