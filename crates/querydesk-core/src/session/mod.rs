//! Session module.
//!
//! Contains the chat session controller that owns the panel's mutable state
//! and coordinates the engine, the conversation store, snippets, and scroll
//! follow behavior.

mod controller;

pub use controller::ChatSessionController;
