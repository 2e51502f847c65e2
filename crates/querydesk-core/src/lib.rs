//! QueryDesk assistant core.
//!
//! The domain layer of the QueryDesk assistant panel: conversation models,
//! the repository and engine seams, the request payload builder, and the
//! chat session controller that ties them together. Storage and transport
//! implementations live in the `querydesk-infrastructure` and
//! `querydesk-engine` crates.

pub mod conversation;
pub mod engine;
pub mod error;
pub mod request;
pub mod scroll;
pub mod session;
pub mod snippet;
pub mod state;

// Re-export common error type
pub use error::QueryDeskError;
