//! Chat engine
//!
//! [`ChatEngine`] ties the session manager, message sync, dispatcher and
//! favorites together behind one object. Front-ends hold it in an `Arc` and
//! call into it from the input loop and the background poller.

use crate::dispatch::{error_reply, Dispatcher};
use crate::error::{ChatError, DispatchError};
use crate::extraction::{extract_candidates, CandidateBlock};
use crate::favorites::FavoritesManager;
use crate::session::{SessionEvent, SessionId, SessionManager};
use crate::store::{Message, MessageStore, Role, SessionSummary};
use crate::sync::{MessageSync, RefreshOutcome};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Result of sending one message
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Session the message was sent in
    pub session: SessionId,
    /// Assistant message: the webhook reply or a fixed error text
    pub reply: Message,
    /// Candidates parsed from the reply
    pub candidates: Vec<CandidateBlock>,
    /// False when the session changed before the reply arrived
    pub applied: bool,
    /// Set when the reply is an error text standing in for a failed dispatch
    pub dispatch_error: Option<DispatchError>,
}

/// Marks a dispatch in flight for [`ChatEngine::is_awaiting_reply`]
struct Typing<'a>(&'a AtomicUsize);

impl<'a> Typing<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Typing<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct ChatEngine {
    sessions: SessionManager,
    sync: MessageSync,
    dispatcher: Arc<dyn Dispatcher>,
    favorites: Option<Arc<FavoritesManager>>,
    persist_messages: bool,
    send_locks: Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>,
    in_flight: AtomicUsize,
    known_sessions: Mutex<Vec<SessionSummary>>,
}

impl ChatEngine {
    /// Create an engine with no current session
    ///
    /// # Examples
    ///
    /// ```
    /// use async_trait::async_trait;
    /// use recruitchat::chat::ChatEngine;
    /// use recruitchat::dispatch::{AssistantReply, Dispatcher};
    /// use recruitchat::error::DispatchError;
    /// use recruitchat::session::SessionId;
    /// use recruitchat::store::MemoryMessageStore;
    /// use std::sync::Arc;
    ///
    /// struct Echo;
    ///
    /// #[async_trait]
    /// impl Dispatcher for Echo {
    ///     async fn send(&self, text: &str, _: &SessionId) -> Result<AssistantReply, DispatchError> {
    ///         Ok(AssistantReply { text: text.to_uppercase() })
    ///     }
    /// }
    ///
    /// # tokio_test::block_on(async {
    /// let engine = ChatEngine::new(Arc::new(MemoryMessageStore::new()), Arc::new(Echo));
    /// let outcome = engine.send("hello").await.unwrap();
    /// assert_eq!(outcome.reply.content, "HELLO");
    /// assert_eq!(engine.messages().len(), 2);
    /// # });
    /// ```
    pub fn new(store: Arc<dyn MessageStore>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            sessions: SessionManager::new(),
            sync: MessageSync::new(store),
            dispatcher,
            favorites: None,
            persist_messages: true,
            send_locks: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            known_sessions: Mutex::new(Vec::new()),
        }
    }

    /// Attach the favorites manager cleaned up on session deletion
    pub fn with_favorites(mut self, favorites: Arc<FavoritesManager>) -> Self {
        self.favorites = Some(favorites);
        self
    }

    /// Whether sent and received messages are written to the store
    pub fn with_persist_messages(mut self, persist: bool) -> Self {
        self.persist_messages = persist;
        self
    }

    pub fn favorites(&self) -> Option<&Arc<FavoritesManager>> {
        self.favorites.as_ref()
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.sessions.current()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sessions.subscribe()
    }

    /// Visible messages of the current session
    pub fn messages(&self) -> Vec<Message> {
        self.sync.messages()
    }

    /// True while a dispatch is waiting for the webhook
    pub fn is_awaiting_reply(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Candidates of the most recent assistant message in view
    pub fn latest_candidates(&self) -> Vec<CandidateBlock> {
        self.sync
            .messages()
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| extract_candidates(&m.content))
            .unwrap_or_default()
    }

    /// Send recruiter text and wait for the assistant's reply
    ///
    /// Dispatch failures do not fail the call: the reply carries a fixed
    /// error text instead. Store failures are logged and the message stays
    /// in view as unconfirmed.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let session = self.sessions.ensure_session();
        if self.sync.session().as_ref() != Some(&session) {
            self.sync.reset(Some(session.clone()));
        }

        let lock = self.send_lock(&session);
        let _serialized = lock.lock().await;

        let user = Message::human(text);
        self.sync.push_local(&session, user.clone());
        self.persist(&session, user).await;

        let result = {
            let _typing = Typing::start(&self.in_flight);
            self.dispatcher.send(text, &session).await
        };
        let (content, dispatch_error) = match result {
            Ok(reply) => (reply.text, None),
            Err(e) => {
                tracing::warn!(session_id = %session, "Dispatch failed: {}", e);
                (error_reply(&e).to_string(), Some(e))
            }
        };

        let reply = Message::assistant(content);
        let applied =
            self.sessions.is_current(&session) && self.sync.push_local(&session, reply.clone());
        if !applied {
            tracing::debug!(session_id = %session, "Session changed, reply not shown");
        }
        let reply = self.persist(&session, reply).await;

        Ok(SendOutcome {
            candidates: extract_candidates(&reply.content),
            session,
            reply,
            applied,
            dispatch_error,
        })
    }

    /// Append `message` to the store and swap in the stored copy
    async fn persist(&self, session: &SessionId, message: Message) -> Message {
        if !self.persist_messages {
            return message;
        }
        let local = message.id.clone();
        match self.sync.store().append(session, &message).await {
            Ok(saved) => {
                self.sync.confirm(session, local, saved.clone());
                saved
            }
            Err(e) => {
                tracing::warn!(session_id = %session, "Failed to save message: {}", e);
                message
            }
        }
    }

    fn send_lock(&self, session: &SessionId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.send_locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.entry(session.clone()).or_default().clone()
    }

    /// Switch to `target`, or start a new conversation when `None`
    ///
    /// The view is cleared before the history of an existing session loads.
    pub async fn select_session(&self, target: Option<SessionId>) -> SessionId {
        let load = target.is_some();
        let id = self.sessions.select_session(target);
        self.sync.reset(Some(id.clone()));
        if load {
            // failures are logged by the sync layer; the view stays empty
            let _ = self.sync.refresh().await;
        }
        id
    }

    /// Reload the current session's history
    pub async fn refresh(&self) -> Result<RefreshOutcome, ChatError> {
        Ok(self.sync.refresh().await?)
    }

    /// Sessions in the store, most recently active first
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ChatError> {
        let summaries = self.sync.store().list_sessions().await?;
        *self
            .known_sessions
            .lock()
            .unwrap_or_else(|p| p.into_inner()) = summaries.clone();
        Ok(summaries)
    }

    /// Session list from the last successful listing
    pub fn known_sessions(&self) -> Vec<SessionSummary> {
        self.known_sessions
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Delete a session's history and its favorites
    ///
    /// Deleting the current session starts a new one.
    pub async fn delete_session(&self, id: &SessionId) -> Result<(), ChatError> {
        self.sync.store().delete_session(id).await?;
        tracing::info!(session_id = %id, "Deleted session history");

        if self.sessions.forget(id) {
            let next = self.sessions.start_new_session();
            self.sync.reset(Some(next));
        }
        self.send_locks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(id);
        self.known_sessions
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .retain(|s| &s.id != id);

        if let Some(favorites) = &self.favorites {
            favorites.remove_session(id).await?;
        }
        Ok(())
    }

    /// Poll the store every `interval` until `token` is cancelled
    pub fn spawn_poller(
        self: &Arc<Self>,
        interval: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("History poller stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let (refreshed, listed) =
                            futures::future::join(engine.refresh(), engine.list_sessions()).await;
                        if let Err(e) = listed {
                            tracing::debug!("Session list poll failed: {}", e);
                        }
                        if let Ok(RefreshOutcome::Updated) = refreshed {
                            tracing::debug!("History updated by poller");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{AssistantReply, DISPATCH_ERROR_REPLY, FORMAT_ERROR_REPLY};
    use crate::store::{MemoryMessageStore, MessageId};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Replies with a fixed result
    struct StubDispatcher {
        reply: std::result::Result<String, DispatchError>,
    }

    #[async_trait]
    impl Dispatcher for StubDispatcher {
        async fn send(
            &self,
            _text: &str,
            _session: &SessionId,
        ) -> std::result::Result<AssistantReply, DispatchError> {
            self.reply.clone().map(|text| AssistantReply { text })
        }
    }

    /// Holds every reply until released
    struct GatedDispatcher {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Dispatcher for GatedDispatcher {
        async fn send(
            &self,
            text: &str,
            _session: &SessionId,
        ) -> std::result::Result<AssistantReply, DispatchError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(AssistantReply {
                text: format!("re: {}", text),
            })
        }
    }

    fn engine_with(
        reply: std::result::Result<&str, DispatchError>,
    ) -> (ChatEngine, Arc<MemoryMessageStore>) {
        let store = Arc::new(MemoryMessageStore::new());
        let dispatcher = StubDispatcher {
            reply: reply.map(str::to_string),
        };
        (ChatEngine::new(store.clone(), Arc::new(dispatcher)), store)
    }

    #[tokio::test]
    async fn test_send_creates_session_and_persists_both_messages() {
        let (engine, store) = engine_with(Ok("Hello"));
        let outcome = engine.send("find rust developers").await.unwrap();

        assert!(outcome.applied);
        assert_eq!(outcome.reply.content, "Hello");
        assert_eq!(engine.current_session(), Some(outcome.session.clone()));

        let stored = store.load(&outcome.session).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, Role::Human);
        assert_eq!(stored[1].role, Role::Assistant);
        assert_eq!(engine.messages(), stored);
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let (engine, _) = engine_with(Ok("Hello"));
        assert_eq!(engine.send("   ").await.unwrap_err(), ChatError::EmptyMessage);
        assert!(engine.current_session().is_none());
    }

    #[tokio::test]
    async fn test_format_error_becomes_assistant_message() {
        let (engine, _) = engine_with(Err(DispatchError::UnexpectedFormat("{}".into())));
        let outcome = engine.send("hi").await.unwrap();
        assert_eq!(outcome.reply.content, FORMAT_ERROR_REPLY);
        assert_eq!(outcome.reply.role, Role::Assistant);
        assert!(outcome.dispatch_error.is_some());
    }

    #[tokio::test]
    async fn test_transport_error_becomes_assistant_message() {
        let (engine, _) = engine_with(Err(DispatchError::Timeout(5)));
        let outcome = engine.send("hi").await.unwrap();
        assert_eq!(outcome.reply.content, DISPATCH_ERROR_REPLY);
        assert!(!engine.is_awaiting_reply());
    }

    #[tokio::test]
    async fn test_store_failure_keeps_messages_visible() {
        let (engine, store) = engine_with(Ok("Hello"));
        store.set_offline(true);

        let outcome = engine.send("hi").await.unwrap();
        assert!(outcome.reply.id.is_local());
        let visible = engine.messages();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|m| m.id.is_local()));

        // a failing refresh leaves them in place
        assert!(engine.refresh().await.is_err());
        assert_eq!(engine.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_unpersisted_messages_survive_refresh() {
        let (engine, _) = engine_with(Ok("Hello"));
        let engine = engine.with_persist_messages(false);
        engine.send("hi").await.unwrap();

        engine.refresh().await.unwrap();
        let contents: Vec<String> = engine.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["hi", "Hello"]);
    }

    #[tokio::test]
    async fn test_candidates_extracted_from_reply() {
        let reply = "Found:\n\n**Name:** Ana\n**Email:** ana@example.com\n\n**Name:** Bruno\n";
        let (engine, _) = engine_with(Ok(reply));
        let outcome = engine.send("devs").await.unwrap();
        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates[0].name, "Ana");
        assert_eq!(engine.latest_candidates().len(), 2);
    }

    #[tokio::test]
    async fn test_switch_to_new_session_clears_view() {
        let (engine, _) = engine_with(Ok("Hello"));
        let first = engine.send("hi").await.unwrap().session;
        assert_eq!(engine.messages().len(), 2);

        let second = engine.select_session(None).await;
        assert_ne!(first, second);
        assert!(engine.messages().is_empty());

        let back = engine.select_session(Some(first.clone())).await;
        assert_eq!(back, first);
        assert_eq!(engine.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_reply_not_applied() {
        let store = Arc::new(MemoryMessageStore::new());
        let dispatcher = Arc::new(GatedDispatcher {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let engine = Arc::new(ChatEngine::new(store.clone(), dispatcher.clone()));

        let task = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.send("question").await })
        };
        dispatcher.entered.notified().await;
        assert!(engine.is_awaiting_reply());

        engine.select_session(None).await;
        dispatcher.release.notify_one();
        let outcome = task.await.unwrap().unwrap();

        assert!(!outcome.applied);
        assert!(engine.messages().is_empty());
        // the reply still belongs to its own session
        let stored = store.load(&outcome.session).await.unwrap();
        assert_eq!(stored.last().unwrap().content, "re: question");
    }

    #[tokio::test]
    async fn test_rapid_sends_are_serialized() {
        let (engine, store) = engine_with(Ok("ok"));
        let engine = Arc::new(engine);
        let session = engine.select_session(None).await;

        let (a, b) = futures::future::join(engine.send("first"), engine.send("second")).await;
        a.unwrap();
        b.unwrap();

        let stored = store.load(&session).await.unwrap();
        let contents: Vec<&str> = stored.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "ok", "second", "ok"]);
    }

    #[tokio::test]
    async fn test_delete_current_session_starts_new_one() {
        let (engine, store) = engine_with(Ok("Hello"));
        let first = engine.send("hi").await.unwrap().session;
        let mut events = engine.subscribe();

        engine.delete_session(&first).await.unwrap();

        assert!(store.load(&first).await.unwrap().is_empty());
        let current = engine.current_session().unwrap();
        assert_ne!(current, first);
        assert!(engine.messages().is_empty());
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Deleted(first));
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Created(current));
    }

    #[tokio::test]
    async fn test_list_sessions() {
        let (engine, _) = engine_with(Ok("Hello"));
        engine.send("first conversation").await.unwrap();
        engine.select_session(None).await;
        engine.send("second conversation").await.unwrap();

        let sessions = engine.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].title, "second conversation");
        assert_eq!(engine.known_sessions(), sessions);
    }

    #[tokio::test]
    async fn test_poller_picks_up_remote_messages() {
        let (engine, store) = engine_with(Ok("Hello"));
        let engine = Arc::new(engine);
        let session = engine.select_session(None).await;
        store
            .append(&session, &Message::human("written elsewhere"))
            .await
            .unwrap();

        let token = CancellationToken::new();
        let handle = engine.spawn_poller(Duration::from_millis(10), token.clone());
        for _ in 0..50 {
            if !engine.messages().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        token.cancel();
        handle.await.unwrap();

        let visible = engine.messages();
        assert_eq!(visible.len(), 1);
        assert!(matches!(visible[0].id, MessageId::Remote(_)));
    }
}
