//! Chat session controller.
//!
//! One owned object holds all mutable state of the assistant panel's active
//! conversation and routes every mutation through explicit operations. It
//! pairs each submitted user turn with the assistant turn the engine streams
//! back and commits the pair atomically to the conversation store, guards
//! conversation switching while a turn is generating, and drops events from
//! exchanges that were cleared away.

use std::sync::Arc;

use crate::conversation::{
    Conversation, ConversationRepository, QueryResult, Turn, DEFAULT_CONVERSATION_NAME,
};
use crate::engine::{ChatEngine, EngineEvent, EngineFailure, ExchangeId};
use crate::error::{QueryDeskError, Result};
use crate::request::{build_request, RequestContext, DEFAULT_MAX_HISTORY};
use crate::scroll::ScrollFollower;
use crate::snippet::SnippetManager;
use crate::state::StateRepository;

/// Drives one chat session against a streaming engine and a durable
/// conversation store.
///
/// The controller is single-owner state: the surrounding event loop calls
/// its operations and forwards engine events into
/// [`ChatSessionController::handle_engine_event`]. There is no internal
/// locking; interleaving is whatever the caller's event loop produces.
pub struct ChatSessionController {
    engine: Arc<dyn ChatEngine>,
    conversations: Arc<dyn ConversationRepository>,
    state: Arc<dyn StateRepository>,
    request_context: RequestContext,
    max_history: usize,
    active_conversation_id: String,
    /// The submitted user turn not yet paired with a completed assistant
    /// turn. At most one exists; cleared exactly once, either by the pair
    /// commit or by clear/switch.
    pending_user_turn: Option<Turn>,
    /// Epoch guard. `Some` while an exchange is outstanding; events carrying
    /// any other exchange ID are stale and dropped.
    current_exchange: Option<ExchangeId>,
    /// Inline failure for the slot the assistant turn would have filled.
    last_failure: Option<EngineFailure>,
    snippets: SnippetManager,
    draft_input: String,
    scroll: ScrollFollower,
}

impl ChatSessionController {
    /// Restores the session from the repositories and seeds the engine.
    ///
    /// Reactivates the recorded active conversation when it still exists;
    /// otherwise creates a fresh one and records it.
    ///
    /// # Errors
    ///
    /// Returns an error if storage access fails.
    pub async fn bootstrap(
        engine: Arc<dyn ChatEngine>,
        conversations: Arc<dyn ConversationRepository>,
        state: Arc<dyn StateRepository>,
        request_context: RequestContext,
    ) -> Result<Self> {
        let restored = match state.get_active_conversation().await {
            Some(id) => conversations.find_by_id(&id).await?,
            None => None,
        };

        let conversation = match restored {
            Some(conversation) => conversation,
            None => {
                let conversation = Conversation::new(DEFAULT_CONVERSATION_NAME);
                conversations.save(&conversation).await?;
                state
                    .set_active_conversation(conversation.id.clone())
                    .await?;
                conversation
            }
        };

        tracing::debug!(conversation_id = %conversation.id, "session bootstrap");
        engine.reset(conversation.turns.clone()).await;

        let mut snippets = SnippetManager::new();
        snippets.replace(conversation.attached_snippets.clone());

        Ok(Self {
            engine,
            conversations,
            state,
            request_context,
            max_history: DEFAULT_MAX_HISTORY,
            active_conversation_id: conversation.id.clone(),
            pending_user_turn: None,
            current_exchange: None,
            last_failure: None,
            snippets,
            draft_input: conversation.draft_input.clone(),
            scroll: ScrollFollower::new(),
        })
    }

    /// Overrides the history window size. Callers should keep it odd so a
    /// truncated window starts on a user turn.
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    // ============================================================================
    // Observable state
    // ============================================================================

    pub fn active_conversation_id(&self) -> &str {
        &self.active_conversation_id
    }

    /// True while an exchange for the active conversation is outstanding.
    pub fn is_generating(&self) -> bool {
        self.current_exchange.is_some()
    }

    pub fn pinned_to_bottom(&self) -> bool {
        self.scroll.pinned_to_bottom()
    }

    pub fn draft_input(&self) -> &str {
        &self.draft_input
    }

    pub fn set_draft_input(&mut self, draft: impl Into<String>) {
        self.draft_input = draft.into();
    }

    pub fn attached_snippets(&self) -> &[String] {
        self.snippets.snippets()
    }

    /// The failure of the most recent exchange, if it ended in one and no
    /// newer submission has started since.
    pub fn last_failure(&self) -> Option<&EngineFailure> {
        self.last_failure.as_ref()
    }

    /// The live transcript as the engine currently shows it.
    pub async fn transcript(&self) -> Vec<Turn> {
        self.engine.transcript().await
    }

    /// Lists stored conversations for the selector, most recent first.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.conversations.list_all().await
    }

    // ============================================================================
    // Scroll follow
    // ============================================================================

    /// Forwards the viewport position reported by the presentation layer.
    pub fn observe_viewport(&mut self, offset: f64, max_offset: f64) {
        self.scroll.observe_viewport(offset, max_offset);
    }

    /// Drains the deferred scroll-to-bottom request for the caller's next tick.
    pub fn take_pending_scroll(&mut self) -> bool {
        self.scroll.take_pending_scroll()
    }

    /// Explicit "jump to latest" affordance.
    pub fn jump_to_latest(&mut self) {
        self.scroll.jump_to_latest();
    }

    // ============================================================================
    // Snippets
    // ============================================================================

    pub fn attach_snippet(&mut self, text: impl Into<String>) {
        self.snippets.attach(text);
    }

    pub fn detach_snippet(&mut self, index: usize) -> Option<String> {
        self.snippets.detach(index)
    }

    pub fn clear_snippets(&mut self) {
        self.snippets.clear();
    }

    // ============================================================================
    // Turn submission and engine events
    // ============================================================================

    /// Submits a user turn composed of `text` and the attached snippets.
    ///
    /// Snippets and the draft are cleared only once the engine has accepted
    /// the submission; a guard rejection leaves them untouched.
    ///
    /// # Errors
    ///
    /// Returns a `Precondition` error while a turn is already generating.
    pub async fn submit_user_turn(&mut self, text: &str) -> Result<ExchangeId> {
        if self.is_generating() {
            return Err(QueryDeskError::precondition(
                "cannot submit while a turn is generating",
            ));
        }

        let content = self.snippets.compose(text);
        let user_turn = Turn::user(content);

        let mut transcript = self.engine.transcript().await;
        transcript.push(user_turn.clone());
        let request = build_request(&transcript, self.max_history, &self.request_context);

        let exchange = self.engine.submit(Some(user_turn.clone()), request).await?;
        tracing::debug!(exchange = exchange.0, "submitted user turn");

        self.pending_user_turn = Some(user_turn);
        self.current_exchange = Some(exchange);
        self.last_failure = None;
        self.snippets.clear();
        self.draft_input.clear();
        self.scroll.notify_content_grown();
        Ok(exchange)
    }

    /// Resubmits the preserved user turn after a failed exchange.
    ///
    /// The failed turn is still the tail of the engine's visible transcript,
    /// so nothing is appended; the window is rebuilt and streamed again.
    ///
    /// # Errors
    ///
    /// Returns a `Precondition` error while generating or when no failed
    /// submission is pending.
    pub async fn retry_last(&mut self) -> Result<ExchangeId> {
        if self.is_generating() {
            return Err(QueryDeskError::precondition(
                "cannot retry while a turn is generating",
            ));
        }
        if self.pending_user_turn.is_none() {
            return Err(QueryDeskError::precondition("no failed submission to retry"));
        }

        let transcript = self.engine.transcript().await;
        let request = build_request(&transcript, self.max_history, &self.request_context);

        let exchange = self.engine.submit(None, request).await?;
        tracing::debug!(exchange = exchange.0, "retrying failed exchange");

        self.current_exchange = Some(exchange);
        self.last_failure = None;
        Ok(exchange)
    }

    /// Streams a fresh assistant answer to the last user turn.
    ///
    /// Rewinds the visible transcript past any trailing assistant turns and
    /// resubmits the window ending at the last user turn. No user turn is
    /// stashed, so completion appends the new assistant turn alone; the
    /// superseded assistant turn stays in the store (the log is
    /// append-only).
    ///
    /// # Errors
    ///
    /// Returns a `Precondition` error while generating or when the
    /// conversation has no user turn to answer again.
    pub async fn regenerate_last(&mut self) -> Result<ExchangeId> {
        if self.is_generating() {
            return Err(QueryDeskError::precondition(
                "cannot regenerate while a turn is generating",
            ));
        }

        let conversation = self.load_active().await?;
        let mut visible = conversation.turns;
        while visible.last().is_some_and(Turn::is_assistant) {
            visible.pop();
        }
        if visible.is_empty() {
            return Err(QueryDeskError::precondition(
                "no user turn to regenerate from",
            ));
        }

        self.engine.reset(visible.clone()).await;
        let request = build_request(&visible, self.max_history, &self.request_context);

        let exchange = self.engine.submit(None, request).await?;
        tracing::debug!(exchange = exchange.0, "regenerating last answer");

        self.current_exchange = Some(exchange);
        self.last_failure = None;
        self.scroll.notify_content_grown();
        Ok(exchange)
    }

    /// Feeds one engine event into the synchronizer state machine.
    ///
    /// Events whose exchange ID is not the current one come from an exchange
    /// that was cleared or superseded; they are dropped without touching any
    /// state, which is what keeps a late completion after clear from
    /// resurrecting turns.
    pub async fn handle_engine_event(&mut self, event: EngineEvent) -> Result<()> {
        if self.current_exchange != Some(event.exchange()) {
            tracing::debug!(exchange = event.exchange().0, "dropping stale engine event");
            return Ok(());
        }

        match event {
            EngineEvent::Delta { .. } => {
                self.scroll.notify_content_grown();
            }
            EngineEvent::TurnComplete { turn, .. } => {
                self.commit_completed_turn(turn).await?;
                self.current_exchange = None;
                self.scroll.notify_generation_finished();
            }
            EngineEvent::Failed { error, .. } => {
                tracing::warn!(%error, "exchange failed");
                // pending_user_turn survives so the caller can retry.
                self.current_exchange = None;
                self.last_failure = Some(error);
            }
        }
        Ok(())
    }

    /// Commits a completed assistant turn, paired with the pending user turn
    /// when one exists, in a single repository save.
    async fn commit_completed_turn(&mut self, assistant_turn: Turn) -> Result<()> {
        let mut conversation = self.load_active().await?;

        if let Some(user_turn) = self.pending_user_turn.take() {
            conversation.turns.push(user_turn);
        }
        conversation.turns.push(assistant_turn);
        conversation.touch();

        self.conversations.save(&conversation).await
    }

    // ============================================================================
    // Clear and switch
    // ============================================================================

    /// Empties the active conversation, from any state.
    ///
    /// Discards in-flight state without waiting for the engine: the current
    /// exchange is forgotten, so its late events fail the epoch guard and
    /// the store stays empty. This is also the recovery path after a
    /// presentation-layer failure, so it avoids depending on engine health
    /// beyond the `reset` contract.
    pub async fn clear_conversation(&mut self) -> Result<()> {
        let mut conversation = match self
            .conversations
            .find_by_id(&self.active_conversation_id)
            .await?
        {
            Some(conversation) => conversation,
            None => Conversation::with_id(
                self.active_conversation_id.clone(),
                DEFAULT_CONVERSATION_NAME,
            ),
        };

        conversation.turns.clear();
        conversation.draft_input.clear();
        conversation.attached_snippets.clear();
        conversation.touch();
        self.conversations.save(&conversation).await?;

        self.engine.reset(Vec::new()).await;

        self.pending_user_turn = None;
        self.current_exchange = None;
        self.last_failure = None;
        self.snippets.clear();
        self.draft_input.clear();
        self.scroll.reset();

        tracing::debug!(conversation_id = %self.active_conversation_id, "conversation cleared");
        Ok(())
    }

    /// Switches the active conversation.
    ///
    /// A no-op when the target is already active or while a turn is
    /// generating (the selector is expected to be disabled then; switching
    /// mid-stream would orphan the pending commit). The outgoing
    /// conversation's draft and snippets are persisted first and the
    /// target's are restored.
    pub async fn switch_conversation(&mut self, conversation_id: &str) -> Result<()> {
        if conversation_id == self.active_conversation_id {
            return Ok(());
        }
        if self.is_generating() {
            tracing::debug!(to = conversation_id, "switch ignored while generating");
            return Ok(());
        }

        if let Some(mut outgoing) = self
            .conversations
            .find_by_id(&self.active_conversation_id)
            .await?
        {
            outgoing.draft_input = self.draft_input.clone();
            outgoing.attached_snippets = self.snippets.snippets().to_vec();
            self.conversations.save(&outgoing).await?;
        }

        let target = match self.conversations.find_by_id(conversation_id).await? {
            Some(conversation) => conversation,
            None => {
                // The selector's "new chat" entry lands here.
                let conversation =
                    Conversation::with_id(conversation_id.to_string(), DEFAULT_CONVERSATION_NAME);
                self.conversations.save(&conversation).await?;
                conversation
            }
        };

        self.engine.reset(target.turns.clone()).await;
        self.state
            .set_active_conversation(conversation_id.to_string())
            .await?;

        self.active_conversation_id = conversation_id.to_string();
        self.pending_user_turn = None;
        self.last_failure = None;
        self.draft_input = target.draft_input.clone();
        self.snippets.replace(target.attached_snippets.clone());
        self.scroll.reset();

        tracing::debug!(conversation_id, "switched conversation");
        Ok(())
    }

    // ============================================================================
    // Result attachment
    // ============================================================================

    /// Attaches query results to a stored assistant turn by ID, replacing by
    /// `result_id` for multi-result turns.
    ///
    /// The engine's visible transcript is reseeded so the attachment shows
    /// up immediately, unless an exchange is streaming (the store is still
    /// updated; the transcript catches up on the next reset).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no stored turn has the given ID.
    pub async fn attach_results(
        &mut self,
        turn_id: &str,
        results: Vec<QueryResult>,
    ) -> Result<()> {
        let mut conversation = self.load_active().await?;

        let turn = conversation
            .turns
            .iter_mut()
            .find(|turn| turn.id == turn_id)
            .ok_or_else(|| QueryDeskError::not_found("Turn", turn_id))?;
        for result in results {
            turn.attach_result(result);
        }

        self.conversations.save(&conversation).await?;

        if !self.is_generating() {
            self.engine.reset(conversation.turns.clone()).await;
        }
        Ok(())
    }

    async fn load_active(&self) -> Result<Conversation> {
        self.conversations
            .find_by_id(&self.active_conversation_id)
            .await?
            .ok_or_else(|| {
                QueryDeskError::not_found("Conversation", self.active_conversation_id.clone())
            })
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
