//! Streaming chat engine contract.
//!
//! The session core never talks to the model backend directly. It drives an
//! engine through the [`ChatEngine`] trait and consumes the typed events the
//! engine publishes on an mpsc channel. This keeps the synchronizer's state
//! machine independent of any particular streaming transport, and lets tests
//! stand in a mock engine.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::conversation::Turn;
use crate::error::Result;
use crate::request::ChatRequest;

/// Identity of one streaming exchange, assigned by the engine per submit.
///
/// Exchange IDs increase monotonically and double as the epoch counter the
/// session controller uses to drop events from a cancelled or cleared
/// exchange: an event whose ID differs from the controller's current one is
/// stale and must be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ExchangeId(pub u64);

/// Why an exchange failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Network or streaming failure before a well-formed backend answer.
    Transport,
    /// The backend answered with a non-success status or refused the turn.
    BackendRejected { status: Option<u16> },
}

/// A terminal exchange failure, surfaced to the user inline in the slot the
/// assistant turn would have occupied. Not fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl EngineFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: message.into(),
        }
    }

    pub fn backend_rejected(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::BackendRejected { status },
            message: message.into(),
        }
    }
}

impl std::fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            FailureKind::Transport => write!(f, "transport failure: {}", self.message),
            FailureKind::BackendRejected { status: Some(s) } => {
                write!(f, "backend rejected ({}): {}", s, self.message)
            }
            FailureKind::BackendRejected { status: None } => {
                write!(f, "backend rejected: {}", self.message)
            }
        }
    }
}

/// Events an engine publishes while executing an exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A batch of streamed assistant content arrived. One event per decoded
    /// network chunk, not per character.
    Delta {
        exchange: ExchangeId,
        content: String,
    },
    /// Streaming finished successfully. Fired exactly once per exchange.
    TurnComplete { exchange: ExchangeId, turn: Turn },
    /// The exchange ended in failure. Fired exactly once per failed exchange.
    Failed {
        exchange: ExchangeId,
        error: EngineFailure,
    },
}

impl EngineEvent {
    /// The exchange this event belongs to.
    pub fn exchange(&self) -> ExchangeId {
        match self {
            Self::Delta { exchange, .. }
            | Self::TurnComplete { exchange, .. }
            | Self::Failed { exchange, .. } => *exchange,
        }
    }
}

/// Sender half of the engine event channel, handed to the engine at
/// construction time.
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiver half of the engine event channel, drained by the caller's event
/// loop and fed to the session controller.
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Creates the event channel connecting an engine to the session controller.
pub fn engine_event_channel() -> (EngineEventSender, EngineEventReceiver) {
    mpsc::unbounded_channel()
}

/// A streaming chat engine.
///
/// The engine owns the transient visible transcript, including the
/// in-progress assistant turn while an exchange streams. The session core
/// only mutates that transcript through `submit` and `reset`.
#[async_trait]
pub trait ChatEngine: Send + Sync {
    /// Begins a new streaming exchange.
    ///
    /// `user_turn` is appended to the visible transcript when present; it is
    /// `None` for regenerate and retry flows where the user turn is already
    /// visible. The prepared `request` is sent to the backend as-is.
    ///
    /// Returns the ID of the new exchange. Subsequent events for this
    /// exchange carry the same ID.
    async fn submit(&self, user_turn: Option<Turn>, request: ChatRequest) -> Result<ExchangeId>;

    /// Live view of the transcript, including any in-progress assistant turn.
    async fn transcript(&self) -> Vec<Turn>;

    /// True while an exchange is streaming.
    async fn is_generating(&self) -> bool;

    /// Replaces the visible transcript.
    ///
    /// Used when switching conversations and by the clear-and-reset recovery
    /// path, so it must succeed even while an exchange is mid-stream; any
    /// still-running exchange becomes stale and stops publishing.
    async fn reset(&self, turns: Vec<Turn>);
}
