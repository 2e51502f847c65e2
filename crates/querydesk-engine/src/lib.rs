//! QueryDesk assistant engine.
//!
//! The HTTP implementation of the streaming chat engine contract defined in
//! `querydesk-core`. The session controller stays transport-agnostic; this
//! crate is the only place that knows the backend speaks newline-delimited
//! JSON over a streamed POST response.

pub mod config;

mod client;
mod decode;

pub use client::StreamingChatClient;
pub use config::EngineConfig;
pub use decode::{StreamEvent, decode_stream_line};
