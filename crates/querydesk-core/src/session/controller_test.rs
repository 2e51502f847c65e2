use super::*;
use crate::conversation::TurnRole;
use crate::request::ChatRequest;
use crate::snippet::wrap_snippet;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

// Mock ChatEngine for testing. Submissions only record state; the test
// drives completion by feeding events into the controller directly.
#[derive(Default)]
struct MockEngine {
    transcript: Mutex<Vec<Turn>>,
    generating: Mutex<bool>,
    next_exchange: AtomicU64,
    requests: Mutex<Vec<ChatRequest>>,
    resets: Mutex<Vec<Vec<Turn>>>,
}

impl MockEngine {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn last_request(&self) -> ChatRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    fn last_reset(&self) -> Vec<Turn> {
        self.resets.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ChatEngine for MockEngine {
    async fn submit(&self, user_turn: Option<Turn>, request: ChatRequest) -> Result<ExchangeId> {
        if let Some(turn) = user_turn {
            self.transcript.lock().unwrap().push(turn);
        }
        self.requests.lock().unwrap().push(request);
        *self.generating.lock().unwrap() = true;
        Ok(ExchangeId(self.next_exchange.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn transcript(&self) -> Vec<Turn> {
        self.transcript.lock().unwrap().clone()
    }

    async fn is_generating(&self) -> bool {
        *self.generating.lock().unwrap()
    }

    async fn reset(&self, turns: Vec<Turn>) {
        self.resets.lock().unwrap().push(turns.clone());
        *self.transcript.lock().unwrap() = turns;
        *self.generating.lock().unwrap() = false;
    }
}

// Mock ConversationRepository for testing
#[derive(Default)]
struct MockConversationRepository {
    conversations: Mutex<HashMap<String, Conversation>>,
}

impl MockConversationRepository {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn get(&self, id: &str) -> Option<Conversation> {
        self.conversations.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl ConversationRepository for MockConversationRepository {
    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        Ok(self.conversations.lock().unwrap().get(conversation_id).cloned())
    }

    async fn save(&self, conversation: &Conversation) -> Result<()> {
        self.conversations
            .lock()
            .unwrap()
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        self.conversations.lock().unwrap().remove(conversation_id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Conversation>> {
        let mut all: Vec<Conversation> =
            self.conversations.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(all)
    }
}

// Mock StateRepository for testing
#[derive(Default)]
struct MockStateRepository {
    active: Mutex<Option<String>>,
}

impl MockStateRepository {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl StateRepository for MockStateRepository {
    async fn get_active_conversation(&self) -> Option<String> {
        self.active.lock().unwrap().clone()
    }

    async fn set_active_conversation(&self, conversation_id: String) -> Result<()> {
        *self.active.lock().unwrap() = Some(conversation_id);
        Ok(())
    }

    async fn clear_active_conversation(&self) -> Result<()> {
        *self.active.lock().unwrap() = None;
        Ok(())
    }
}

type Fixture = (
    ChatSessionController,
    Arc<MockEngine>,
    Arc<MockConversationRepository>,
    Arc<MockStateRepository>,
);

async fn fixture() -> Fixture {
    let engine = MockEngine::new();
    let conversations = MockConversationRepository::new();
    let state = MockStateRepository::new();
    let controller = ChatSessionController::bootstrap(
        engine.clone(),
        conversations.clone(),
        state.clone(),
        RequestContext::default(),
    )
    .await
    .unwrap();
    (controller, engine, conversations, state)
}

async fn complete(
    controller: &mut ChatSessionController,
    exchange: ExchangeId,
    content: &str,
) -> Turn {
    let turn = Turn::assistant(content);
    controller
        .handle_engine_event(EngineEvent::TurnComplete {
            exchange,
            turn: turn.clone(),
        })
        .await
        .unwrap();
    turn
}

#[tokio::test]
async fn test_bootstrap_creates_and_activates_first_conversation() {
    let (controller, _, conversations, state) = fixture().await;

    let active_id = controller.active_conversation_id().to_string();
    assert!(conversations.get(&active_id).is_some());
    assert_eq!(state.get_active_conversation().await, Some(active_id));
    assert!(!controller.is_generating());
    assert!(controller.pinned_to_bottom());
}

#[tokio::test]
async fn test_bootstrap_restores_recorded_conversation() {
    let engine = MockEngine::new();
    let conversations = MockConversationRepository::new();
    let state = MockStateRepository::new();

    let mut stored = Conversation::new("Query tuning");
    stored.turns.push(Turn::user("hello"));
    stored.turns.push(Turn::assistant("hi"));
    stored.draft_input = "half-typed".to_string();
    stored.attached_snippets = vec!["SELECT 1".to_string()];
    conversations.save(&stored).await.unwrap();
    state.set_active_conversation(stored.id.clone()).await.unwrap();

    let controller = ChatSessionController::bootstrap(
        engine.clone(),
        conversations,
        state,
        RequestContext::default(),
    )
    .await
    .unwrap();

    assert_eq!(controller.active_conversation_id(), stored.id);
    assert_eq!(controller.draft_input(), "half-typed");
    assert_eq!(controller.attached_snippets(), ["SELECT 1".to_string()]);
    assert_eq!(engine.last_reset().len(), 2);
}

#[tokio::test]
async fn test_submit_then_complete_commits_pair_in_order() {
    let (mut controller, _, conversations, _) = fixture().await;

    let exchange = controller.submit_user_turn("Create a table").await.unwrap();
    assert!(controller.is_generating());

    let assistant = complete(&mut controller, exchange, "Sure, here is the DDL").await;

    let stored = conversations
        .get(controller.active_conversation_id())
        .unwrap();
    assert_eq!(stored.turns.len(), 2);
    assert_eq!(stored.turns[0].role, TurnRole::User);
    assert_eq!(stored.turns[0].content, "Create a table");
    assert_eq!(stored.turns[1].id, assistant.id);
    assert!(!controller.is_generating());

    // The pending turn was consumed: a second completion-shaped event from a
    // fresh exchange would have nothing to pair, and a resubmission works.
    let next = controller.submit_user_turn("And an index").await.unwrap();
    assert_ne!(next, exchange);
}

#[tokio::test]
async fn test_submit_while_generating_is_rejected_and_preserves_snippets() {
    let (mut controller, _, _, _) = fixture().await;

    controller.submit_user_turn("first").await.unwrap();
    controller.attach_snippet("SELECT * FROM users");

    let rejected = controller.submit_user_turn("second").await.unwrap_err();

    assert!(rejected.is_precondition());
    assert_eq!(
        controller.attached_snippets(),
        ["SELECT * FROM users".to_string()]
    );
}

#[tokio::test]
async fn test_snippets_compose_into_submission_and_clear_once() {
    let (mut controller, engine, _, _) = fixture().await;

    controller.attach_snippet("SELECT * FROM users");
    controller.attach_snippet("SELECT count(*) FROM orders");

    controller.submit_user_turn("why slow?").await.unwrap();

    let request = engine.last_request();
    let sent = &request.messages.last().unwrap().content;
    assert_eq!(
        *sent,
        format!(
            "why slow?\n\n{}\n{}",
            wrap_snippet("SELECT * FROM users"),
            wrap_snippet("SELECT count(*) FROM orders"),
        )
    );
    assert!(controller.attached_snippets().is_empty());
    assert!(controller.draft_input().is_empty());
}

#[tokio::test]
async fn test_request_window_is_bounded() {
    let (mut controller, engine, _, _) = fixture().await;

    let mut exchange = controller.submit_user_turn("turn 0").await.unwrap();
    complete(&mut controller, exchange, "answer 0").await;
    for i in 1..4 {
        exchange = controller
            .submit_user_turn(&format!("turn {}", i))
            .await
            .unwrap();
        complete(&mut controller, exchange, &format!("answer {}", i)).await;
    }

    // Transcript now holds 8 turns; the next submission makes 9 but only the
    // last 5 go out.
    controller.submit_user_turn("latest question").await.unwrap();
    let request = engine.last_request();
    assert_eq!(request.messages.len(), 5);
    assert_eq!(request.messages.last().unwrap().content, "latest question");
}

#[tokio::test]
async fn test_switch_while_generating_is_noop() {
    let (mut controller, _, conversations, state) = fixture().await;
    let original = controller.active_conversation_id().to_string();

    let other = Conversation::new("Other chat");
    conversations.save(&other).await.unwrap();

    controller.submit_user_turn("working on it").await.unwrap();
    controller.switch_conversation(&other.id).await.unwrap();

    assert_eq!(controller.active_conversation_id(), original);
    assert_eq!(state.get_active_conversation().await, Some(original));
    assert!(controller.is_generating());
}

#[tokio::test]
async fn test_clear_empties_store_and_ignores_stale_completion() {
    let (mut controller, engine, conversations, _) = fixture().await;

    let exchange = controller.submit_user_turn("Create a table").await.unwrap();
    controller.clear_conversation().await.unwrap();

    let stored = conversations
        .get(controller.active_conversation_id())
        .unwrap();
    assert!(stored.turns.is_empty());
    assert!(engine.last_reset().is_empty());
    assert!(!controller.is_generating());

    // The pre-clear exchange completes late; its epoch is stale.
    complete(&mut controller, exchange, "Sure, here it is").await;

    let stored = conversations
        .get(controller.active_conversation_id())
        .unwrap();
    assert!(stored.turns.is_empty());
}

#[tokio::test]
async fn test_failure_keeps_pending_and_retry_commits_pair() {
    let (mut controller, _, conversations, _) = fixture().await;

    let exchange = controller.submit_user_turn("flaky question").await.unwrap();
    controller
        .handle_engine_event(EngineEvent::Failed {
            exchange,
            error: EngineFailure::transport("connection reset"),
        })
        .await
        .unwrap();

    assert!(!controller.is_generating());
    assert!(controller.last_failure().is_some());
    // Nothing was committed.
    let stored = conversations
        .get(controller.active_conversation_id())
        .unwrap();
    assert!(stored.turns.is_empty());

    let retry = controller.retry_last().await.unwrap();
    assert!(controller.last_failure().is_none());
    complete(&mut controller, retry, "second time lucky").await;

    let stored = conversations
        .get(controller.active_conversation_id())
        .unwrap();
    assert_eq!(stored.turns.len(), 2);
    assert_eq!(stored.turns[0].content, "flaky question");
    assert_eq!(stored.turns[1].content, "second time lucky");
}

#[tokio::test]
async fn test_retry_without_failure_is_rejected() {
    let (mut controller, _, _, _) = fixture().await;
    let rejected = controller.retry_last().await.unwrap_err();
    assert!(rejected.is_precondition());
}

#[tokio::test]
async fn test_regenerate_appends_lone_assistant_turn() {
    let (mut controller, engine, conversations, _) = fixture().await;

    let exchange = controller.submit_user_turn("Create a table").await.unwrap();
    complete(&mut controller, exchange, "first answer").await;

    let regen = controller.regenerate_last().await.unwrap();
    // The visible transcript was rewound to end at the user turn.
    assert_eq!(engine.last_reset().len(), 1);
    assert_eq!(engine.last_reset()[0].role, TurnRole::User);

    complete(&mut controller, regen, "better answer").await;

    let stored = conversations
        .get(controller.active_conversation_id())
        .unwrap();
    assert_eq!(stored.turns.len(), 3);
    assert_eq!(stored.turns[1].content, "first answer");
    assert_eq!(stored.turns[2].content, "better answer");
    assert_eq!(stored.turns[2].role, TurnRole::Assistant);
}

#[tokio::test]
async fn test_regenerate_on_empty_conversation_is_rejected() {
    let (mut controller, _, _, _) = fixture().await;
    let rejected = controller.regenerate_last().await.unwrap_err();
    assert!(rejected.is_precondition());
}

#[tokio::test]
async fn test_switch_restores_draft_and_snippets() {
    let (mut controller, _, conversations, state) = fixture().await;
    let original = controller.active_conversation_id().to_string();

    controller.set_draft_input("unsent thought");
    controller.attach_snippet("SELECT 1");

    let other = Conversation::new("Other chat");
    conversations.save(&other).await.unwrap();
    controller.switch_conversation(&other.id).await.unwrap();

    assert_eq!(controller.active_conversation_id(), other.id);
    assert_eq!(state.get_active_conversation().await, Some(other.id.clone()));
    assert!(controller.draft_input().is_empty());
    assert!(controller.attached_snippets().is_empty());

    controller.switch_conversation(&original).await.unwrap();

    assert_eq!(controller.draft_input(), "unsent thought");
    assert_eq!(controller.attached_snippets(), ["SELECT 1".to_string()]);
}

#[tokio::test]
async fn test_switch_to_unknown_id_creates_conversation() {
    let (mut controller, _, conversations, _) = fixture().await;

    controller.switch_conversation("fresh-id").await.unwrap();

    assert_eq!(controller.active_conversation_id(), "fresh-id");
    let created = conversations.get("fresh-id").unwrap();
    assert!(created.turns.is_empty());
    assert_eq!(created.name, DEFAULT_CONVERSATION_NAME);
}

#[tokio::test]
async fn test_delta_batches_schedule_a_single_deferred_scroll() {
    let (mut controller, _, _, _) = fixture().await;

    let exchange = controller.submit_user_turn("stream me").await.unwrap();
    // Drain the scroll scheduled by the submission itself.
    assert!(controller.take_pending_scroll());

    for chunk in ["Sure", ", here", " you go"] {
        controller
            .handle_engine_event(EngineEvent::Delta {
                exchange,
                content: chunk.to_string(),
            })
            .await
            .unwrap();
    }

    assert!(controller.take_pending_scroll());
    assert!(!controller.take_pending_scroll());
}

#[tokio::test]
async fn test_unpinned_viewport_suppresses_deferred_scroll() {
    let (mut controller, _, _, _) = fixture().await;

    let exchange = controller.submit_user_turn("stream me").await.unwrap();
    controller.take_pending_scroll();
    controller.observe_viewport(10.0, 400.0);

    controller
        .handle_engine_event(EngineEvent::Delta {
            exchange,
            content: "chunk".to_string(),
        })
        .await
        .unwrap();

    assert!(!controller.pinned_to_bottom());
    assert!(!controller.take_pending_scroll());
}

#[tokio::test]
async fn test_attach_results_updates_stored_turn() {
    let (mut controller, engine, conversations, _) = fixture().await;

    let exchange = controller.submit_user_turn("run this").await.unwrap();
    let assistant = complete(&mut controller, exchange, "SELECT 42").await;

    controller
        .attach_results(
            &assistant.id,
            vec![QueryResult {
                result_id: "r1".to_string(),
                data: serde_json::json!([{"answer": 42}]),
            }],
        )
        .await
        .unwrap();

    let stored = conversations
        .get(controller.active_conversation_id())
        .unwrap();
    assert_eq!(stored.turns[1].results.len(), 1);
    // The visible transcript was reseeded with the attachment.
    assert_eq!(engine.last_reset()[1].results.len(), 1);

    let missing = controller.attach_results("no-such-turn", Vec::new()).await;
    assert!(missing.unwrap_err().is_not_found());
}
