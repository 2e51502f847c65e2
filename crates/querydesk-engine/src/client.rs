//! Streaming backend client.
//!
//! [`StreamingChatClient`] implements the core's `ChatEngine` contract over
//! HTTP: one POST per exchange, with the response consumed as a stream of
//! newline-delimited JSON events. The stream is read in a spawned task so
//! `submit` returns as soon as the exchange is underway; progress reaches
//! the session controller through the engine event channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::RwLock;

use querydesk_core::conversation::Turn;
use querydesk_core::engine::{
    ChatEngine, EngineEvent, EngineEventSender, EngineFailure, ExchangeId,
};
use querydesk_core::error::{QueryDeskError, Result};
use querydesk_core::request::ChatRequest;

use crate::config::EngineConfig;
use crate::decode::{StreamEvent, decode_stream_line};

/// A `ChatEngine` talking to the assistant backend over HTTP.
pub struct StreamingChatClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: EngineConfig,
    events: EngineEventSender,
    /// Visible transcript, including the in-progress assistant turn.
    transcript: RwLock<Vec<Turn>>,
    /// ID of the exchange currently streaming, 0 when idle. A reset zeroes
    /// this, which makes any still-running stream task stale: it stops
    /// touching the transcript and publishes nothing further.
    live_exchange: AtomicU64,
    exchange_counter: AtomicU64,
}

impl StreamingChatClient {
    /// Creates a client publishing events on `events`.
    pub fn new(config: EngineConfig, events: EngineEventSender) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http: reqwest::Client::new(),
                config,
                events,
                transcript: RwLock::new(Vec::new()),
                live_exchange: AtomicU64::new(0),
                exchange_counter: AtomicU64::new(0),
            }),
        }
    }
}

#[async_trait]
impl ChatEngine for StreamingChatClient {
    async fn submit(&self, user_turn: Option<Turn>, request: ChatRequest) -> Result<ExchangeId> {
        if self.inner.live_exchange.load(Ordering::SeqCst) != 0 {
            return Err(QueryDeskError::precondition(
                "an exchange is already streaming",
            ));
        }

        let exchange = ExchangeId(self.inner.exchange_counter.fetch_add(1, Ordering::SeqCst) + 1);

        {
            let mut transcript = self.inner.transcript.write().await;
            if let Some(turn) = user_turn {
                transcript.push(turn);
            }
            // The in-progress slot the stream fills in.
            transcript.push(Turn::assistant(String::new()));
        }
        self.inner.live_exchange.store(exchange.0, Ordering::SeqCst);

        tracing::debug!(exchange = exchange.0, endpoint = %self.inner.config.endpoint, "starting exchange");
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_exchange(exchange, request).await;
        });

        Ok(exchange)
    }

    async fn transcript(&self) -> Vec<Turn> {
        self.inner.transcript.read().await.clone()
    }

    async fn is_generating(&self) -> bool {
        self.inner.live_exchange.load(Ordering::SeqCst) != 0
    }

    async fn reset(&self, turns: Vec<Turn>) {
        self.inner.live_exchange.store(0, Ordering::SeqCst);
        *self.inner.transcript.write().await = turns;
    }
}

impl ClientInner {
    fn is_live(&self, exchange: ExchangeId) -> bool {
        self.live_exchange.load(Ordering::SeqCst) == exchange.0
    }

    /// Marks the exchange finished. Returns false when a reset already made
    /// it stale, in which case nothing may be published for it.
    fn end_if_live(&self, exchange: ExchangeId) -> bool {
        self.live_exchange
            .compare_exchange(exchange.0, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    async fn run_exchange(&self, exchange: ExchangeId, request: ChatRequest) {
        match self.stream_exchange(exchange, &request).await {
            Ok(Some(turn)) => {
                if self.end_if_live(exchange) {
                    let _ = self.events.send(EngineEvent::TurnComplete { exchange, turn });
                }
            }
            Ok(None) => {
                tracing::debug!(exchange = exchange.0, "exchange went stale mid-stream");
            }
            Err(error) => {
                if self.end_if_live(exchange) {
                    tracing::warn!(exchange = exchange.0, %error, "exchange failed");
                    // Leave the user turn as the transcript tail so a retry
                    // can resubmit the same window.
                    let mut transcript = self.transcript.write().await;
                    if transcript.last().is_some_and(Turn::is_assistant) {
                        transcript.pop();
                    }
                    drop(transcript);
                    let _ = self.events.send(EngineEvent::Failed { exchange, error });
                }
            }
        }
    }

    async fn stream_exchange(
        &self,
        exchange: ExchangeId,
        request: &ChatRequest,
    ) -> std::result::Result<Option<Turn>, EngineFailure> {
        let mut http_request = self.http.post(&self.config.endpoint).json(request);
        if let Some(api_key) = &self.config.api_key {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request
            .send()
            .await
            .map_err(|err| EngineFailure::transport(format!("request failed: {}", err)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, body));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut done = false;

        'stream: while let Some(chunk) = stream.next().await {
            if !self.is_live(exchange) {
                return Ok(None);
            }
            let chunk = chunk
                .map_err(|err| EngineFailure::transport(format!("stream interrupted: {}", err)))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // One delta batch per network chunk, however many lines it held.
            let mut batch = String::new();
            while let Some(newline) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline).collect();
                match decode_stream_line(&line)
                    .map_err(|err| EngineFailure::transport(format!("malformed stream event: {}", err)))?
                {
                    Some(StreamEvent::Delta { content }) => batch.push_str(&content),
                    Some(StreamEvent::Error { message }) => {
                        return Err(EngineFailure::backend_rejected(None, message));
                    }
                    Some(StreamEvent::Done) => {
                        done = true;
                    }
                    None => {}
                }
            }

            if !batch.is_empty() {
                self.append_to_open_turn(exchange, &batch).await;
                let _ = self.events.send(EngineEvent::Delta {
                    exchange,
                    content: batch,
                });
            }
            if done {
                break 'stream;
            }
        }

        if !done {
            return Err(EngineFailure::transport(
                "stream ended before completion signal",
            ));
        }

        if !self.is_live(exchange) {
            return Ok(None);
        }
        let transcript = self.transcript.read().await;
        Ok(transcript.last().filter(|turn| turn.is_assistant()).cloned())
    }

    async fn append_to_open_turn(&self, exchange: ExchangeId, delta: &str) {
        if !self.is_live(exchange) {
            return;
        }
        let mut transcript = self.transcript.write().await;
        if let Some(turn) = transcript.last_mut() {
            if turn.is_assistant() {
                turn.content.push_str(delta);
            }
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Maps a non-success HTTP answer to a typed failure, extracting the message
/// from the backend's JSON error envelope when the body carries one.
fn map_http_error(status: u16, body: String) -> EngineFailure {
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);

    EngineFailure::backend_rejected(Some(status), message)
}
