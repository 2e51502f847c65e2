//! Data Transfer Objects (DTOs) for persistence.
//!
//! These DTOs represent the schema for persisting data. They are private to
//! the infrastructure layer and keep the storage format decoupled from the
//! domain models in `querydesk-core`.

mod app_state;
mod conversation;

pub use app_state::AppStateV1;
pub use conversation::{ConversationV1, ResultV1, TurnV1};
