//! Session orchestrator: owns the transcript, the sidebar history, the
//! favorites projection, and the toast queue, and drives every chat
//! operation against the API.
//!
//! Sends are optimistic: the user's message appears immediately as Pending
//! under a client-generated id, then that exact message is confirmed or
//! failed by id when the network settles. A failed send never removes the
//! user's text; it marks it Failed, appends an explanatory bot message,
//! and raises exactly one error toast with the same text.

use serde_json::Value;
use tokio::time::Duration;

use crate::api::{ApiError, ApiResponse, ChatClient, FileUpload};

use super::{
    dedup_history, favorites_from_wire, generate_id, history_from_wire, session_messages,
    wire_string, ChatHistoryItem, Delivery, FavoriteMessage, Message, Role, ToastKind, ToastQueue,
};

// ─────────────────────────────────────────────────────────────────────────────
// API seam
// ─────────────────────────────────────────────────────────────────────────────

/// The subset of the API surface the orchestrator drives. `ChatClient` is
/// the real implementation; tests script responses through a fake.
#[allow(async_fn_in_trait)]
pub trait ChatApi {
    async fn send_message(
        &self,
        token: &str,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ApiResponse<Value>, ApiError>;

    async fn send_message_with_files(
        &self,
        token: &str,
        message: &str,
        session_id: Option<&str>,
        files: &[FileUpload],
    ) -> Result<ApiResponse<Value>, ApiError>;

    async fn get_history(&self, token: &str) -> Result<ApiResponse<Value>, ApiError>;

    async fn new_session(&self, token: &str) -> Result<ApiResponse<Value>, ApiError>;

    async fn get_session(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError>;

    async fn delete_conversation(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError>;

    async fn get_favorites(&self, token: &str) -> Result<ApiResponse<Value>, ApiError>;

    async fn toggle_favorite(
        &self,
        token: &str,
        message_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError>;

    async fn remove_favorite(
        &self,
        token: &str,
        message_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError>;
}

impl ChatApi for ChatClient {
    async fn send_message(
        &self,
        token: &str,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ApiResponse<Value>, ApiError> {
        ChatClient::send_message(self, token, message, session_id).await
    }

    async fn send_message_with_files(
        &self,
        token: &str,
        message: &str,
        session_id: Option<&str>,
        files: &[FileUpload],
    ) -> Result<ApiResponse<Value>, ApiError> {
        ChatClient::send_message_with_files(self, token, message, session_id, files).await
    }

    async fn get_history(&self, token: &str) -> Result<ApiResponse<Value>, ApiError> {
        ChatClient::get_history(self, token).await
    }

    async fn new_session(&self, token: &str) -> Result<ApiResponse<Value>, ApiError> {
        ChatClient::new_session(self, token).await
    }

    async fn get_session(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        ChatClient::get_session(self, token, session_id).await
    }

    async fn delete_conversation(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        ChatClient::delete_conversation(self, token, session_id).await
    }

    async fn get_favorites(&self, token: &str) -> Result<ApiResponse<Value>, ApiError> {
        ChatClient::get_favorites(self, token).await
    }

    async fn toggle_favorite(
        &self,
        token: &str,
        message_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        ChatClient::toggle_favorite(self, token, message_id).await
    }

    async fn remove_favorite(
        &self,
        token: &str,
        message_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        ChatClient::remove_favorite(self, token, message_id).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────────────────

pub struct ChatOrchestrator<A: ChatApi> {
    api: A,
    token: String,
    pub messages: Vec<Message>,
    pub chat_history: Vec<ChatHistoryItem>,
    pub favorites: Vec<FavoriteMessage>,
    pub current_session_id: Option<String>,
    pub is_loading: bool,
    pub toasts: ToastQueue,
}

impl<A: ChatApi> ChatOrchestrator<A> {
    pub fn new(api: A, token: String, toast_duration: Duration) -> Self {
        Self {
            api,
            token,
            messages: Vec::new(),
            chat_history: Vec::new(),
            favorites: Vec::new(),
            current_session_id: None,
            is_loading: false,
            toasts: ToastQueue::new(toast_duration),
        }
    }

    /// Send a text message. Blank input is a complete no-op: no network
    /// call, no transcript change.
    pub async fn send_message(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let pending_id = generate_id();
        self.messages.push(Message::pending_user(pending_id.clone(), text));
        self.is_loading = true;

        let result = self
            .api
            .send_message(&self.token, text, self.current_session_id.as_deref())
            .await;
        self.is_loading = false;

        match result {
            Ok(resp) if resp.success => {
                self.settle_send(&pending_id, resp.data.as_ref());
                self.refresh_history_quiet().await;
                true
            }
            Ok(resp) => {
                let msg = resp
                    .message
                    .unwrap_or_else(|| "Something went wrong. Please try again.".to_string());
                self.fail_send(&pending_id, msg);
                false
            }
            Err(err) => {
                self.fail_send(&pending_id, err.user_message().to_string());
                false
            }
        }
    }

    /// Send a message with file attachments. The confirmed user message is
    /// rebuilt from the server payload so attachment metadata (server paths,
    /// CDN urls) comes from the authoritative copy.
    pub async fn send_message_with_files(&mut self, text: &str, files: Vec<FileUpload>) -> bool {
        let text = text.trim();
        if text.is_empty() && files.is_empty() {
            return false;
        }

        let pending_id = generate_id();
        self.messages.push(Message::pending_user(pending_id.clone(), text));
        self.is_loading = true;

        let result = self
            .api
            .send_message_with_files(&self.token, text, self.current_session_id.as_deref(), &files)
            .await;
        self.is_loading = false;

        match result {
            Ok(resp) if resp.success => {
                if let Some(data) = resp.data.as_ref() {
                    if let Some(user_wire) = data.get("userMessage").or_else(|| data.get("user_message")) {
                        let mut confirmed = Message::from_wire(user_wire, 0);
                        confirmed.role = Role::User;
                        if let Some(slot) =
                            self.messages.iter_mut().find(|m| m.id == pending_id)
                        {
                            *slot = confirmed;
                        }
                    }
                }
                self.settle_send(&pending_id, resp.data.as_ref());
                self.refresh_history_quiet().await;
                true
            }
            Ok(resp) => {
                let msg = resp
                    .message
                    .unwrap_or_else(|| "Something went wrong. Please try again.".to_string());
                self.fail_send(&pending_id, msg);
                false
            }
            Err(err) => {
                self.fail_send(&pending_id, err.user_message().to_string());
                false
            }
        }
    }

    /// Successful send: confirm the pending message (adopting a server id
    /// when one comes back), adopt the server's session id, append the bot
    /// reply under the server's message id when it provides one.
    fn settle_send(&mut self, pending_id: &str, data: Option<&Value>) {
        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == pending_id) {
            msg.delivery = Delivery::Confirmed;
            if let Some(server_id) =
                data.and_then(|d| wire_string(d, &["userMessageId", "user_message_id"]))
            {
                msg.id = server_id;
            }
        }

        if let Some(data) = data {
            if let Some(session_id) = wire_string(data, &["sessionId", "session_id"]) {
                self.current_session_id = Some(session_id);
            }
            // the reply arrives either as an object carrying its own
            // id/content/timestamp or as a flat string
            if let Some(reply_wire) = ["message", "response", "reply"]
                .iter()
                .filter_map(|key| data.get(*key))
                .find(|v| v.is_object())
            {
                let mut reply = Message::from_wire(reply_wire, 0);
                reply.role = Role::Bot;
                self.messages.push(reply);
            } else if let Some(reply) = wire_string(data, &["response", "message", "reply"]) {
                let reply_id = wire_string(data, &["messageId", "message_id"])
                    .unwrap_or_else(generate_id);
                self.messages.push(Message::bot(reply_id, reply));
            }
        }
    }

    /// Sidebar refresh after a state-changing operation. A refresh failure
    /// never affects the outcome of the operation that triggered it, so
    /// errors are logged and swallowed here.
    async fn refresh_history_quiet(&mut self) {
        match self.api.get_history(&self.token).await {
            Ok(resp) if resp.success => {
                let data = resp.data.unwrap_or(Value::Null);
                self.chat_history = dedup_history(history_from_wire(&data));
            }
            Ok(resp) => {
                tracing::debug!(message = ?resp.message, "History refresh rejected");
            }
            Err(err) => {
                tracing::debug!(error = %err, "History refresh failed");
            }
        }
    }

    /// Failed send: the user's text stays in the transcript marked Failed,
    /// a bot message explains what happened, and one error toast carries
    /// the same text.
    fn fail_send(&mut self, pending_id: &str, user_message: String) {
        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == pending_id) {
            msg.delivery = Delivery::Failed;
        }
        self.messages.push(Message::bot(generate_id(), user_message.clone()));
        self.toasts.show(user_message, ToastKind::Error);
    }

    /// Start a fresh conversation. On success the transcript clears and the
    /// server's session id becomes current; on failure nothing changes.
    pub async fn new_session(&mut self) -> bool {
        match self.api.new_session(&self.token).await {
            Ok(resp) if resp.success => {
                self.current_session_id = resp
                    .data
                    .as_ref()
                    .and_then(|d| wire_string(d, &["sessionId", "session_id"]));
                self.messages.clear();
                self.refresh_history_quiet().await;
                self.toasts.show("Started a new conversation", ToastKind::Success);
                true
            }
            Ok(resp) => {
                self.toast_api_message(resp.message);
                false
            }
            Err(err) => {
                self.toasts.show(err.user_message(), ToastKind::Error);
                false
            }
        }
    }

    /// Load a stored conversation into the transcript. The transcript is
    /// replaced only on success; a failed load leaves the current one intact.
    pub async fn load_session(&mut self, session_id: &str) -> bool {
        self.is_loading = true;
        let result = self.api.get_session(&self.token, session_id).await;
        self.is_loading = false;

        match result {
            Ok(resp) if resp.success => {
                let data = resp.data.unwrap_or(Value::Null);
                self.messages = session_messages(&data);
                self.current_session_id = Some(session_id.to_string());
                true
            }
            Ok(resp) => {
                self.toast_api_message(resp.message);
                false
            }
            Err(err) => {
                self.toasts.show(err.user_message(), ToastKind::Error);
                false
            }
        }
    }

    /// Delete a conversation. The transcript clears only when the deleted
    /// session is the active one; deleting a background session leaves the
    /// transcript alone.
    pub async fn delete_conversation(&mut self, session_id: &str) -> bool {
        match self.api.delete_conversation(&self.token, session_id).await {
            Ok(resp) if resp.success => {
                if self.current_session_id.as_deref() == Some(session_id) {
                    self.messages.clear();
                    self.current_session_id = None;
                }
                self.refresh_history_quiet().await;
                self.toasts.show("Conversation deleted", ToastKind::Success);
                true
            }
            Ok(resp) => {
                self.toast_api_message(resp.message);
                false
            }
            Err(err) => {
                self.toasts.show(err.user_message(), ToastKind::Error);
                false
            }
        }
    }

    /// Refresh the sidebar from the server, deduped first-occurrence-wins
    pub async fn load_chat_history(&mut self) -> bool {
        match self.api.get_history(&self.token).await {
            Ok(resp) if resp.success => {
                let data = resp.data.unwrap_or(Value::Null);
                self.chat_history = dedup_history(history_from_wire(&data));
                true
            }
            Ok(resp) => {
                self.toast_api_message(resp.message);
                false
            }
            Err(err) => {
                self.toasts.show(err.user_message(), ToastKind::Error);
                false
            }
        }
    }

    /// Refresh the favorites projection
    pub async fn load_favorites(&mut self) -> bool {
        match self.api.get_favorites(&self.token).await {
            Ok(resp) if resp.success => {
                let data = resp.data.unwrap_or(Value::Null);
                self.favorites = favorites_from_wire(&data);
                true
            }
            Ok(resp) => {
                self.toast_api_message(resp.message);
                false
            }
            Err(err) => {
                self.toasts.show(err.user_message(), ToastKind::Error);
                false
            }
        }
    }

    /// Flip the favorite flag on one message. The server's reported state
    /// wins over the local flip; only the target message changes, and on
    /// the favoriting direction the projection is refreshed so it reflects
    /// the server's copy.
    pub async fn toggle_favorite(&mut self, message_id: &str) -> bool {
        match self.api.toggle_favorite(&self.token, message_id).await {
            Ok(resp) if resp.success => {
                let server_state = resp
                    .data
                    .as_ref()
                    .and_then(|d| d.get("isFavorite").or_else(|| d.get("is_favorite")))
                    .and_then(Value::as_bool);
                let mut now_favorited = server_state.unwrap_or(false);
                if let Some(msg) = self.messages.iter_mut().find(|m| m.id == message_id) {
                    msg.is_favorite = server_state.unwrap_or(!msg.is_favorite);
                    now_favorited = msg.is_favorite;
                }
                if now_favorited {
                    self.load_favorites().await;
                    self.toasts.show("Added to favorites", ToastKind::Success);
                } else {
                    self.favorites.retain(|f| f.id != message_id);
                    self.toasts.show("Removed from favorites", ToastKind::Info);
                }
                true
            }
            Ok(resp) => {
                self.toast_api_message(resp.message);
                false
            }
            Err(err) => {
                self.toasts.show(err.user_message(), ToastKind::Error);
                false
            }
        }
    }

    /// Remove a favorite from the projection directly (favorites view)
    pub async fn remove_favorite(&mut self, message_id: &str) -> bool {
        match self.api.remove_favorite(&self.token, message_id).await {
            Ok(resp) if resp.success => {
                self.favorites.retain(|f| f.id != message_id);
                if let Some(msg) = self.messages.iter_mut().find(|m| m.id == message_id) {
                    msg.is_favorite = false;
                }
                true
            }
            Ok(resp) => {
                self.toast_api_message(resp.message);
                false
            }
            Err(err) => {
                self.toasts.show(err.user_message(), ToastKind::Error);
                false
            }
        }
    }

    fn toast_api_message(&mut self, message: Option<String>) {
        let text = message.unwrap_or_else(|| "Something went wrong. Please try again.".to_string());
        self.toasts.show(text, ToastKind::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Scripted fake: pops one canned result per call, in order, and
    /// records which calls were made.
    struct ScriptedApi {
        script: RefCell<VecDeque<Result<ApiResponse<Value>, ApiError>>>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedApi {
        fn new(script: Vec<Result<ApiResponse<Value>, ApiError>>) -> Self {
            Self {
                script: RefCell::new(script.into()),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn next(&self, call: &str) -> Result<ApiResponse<Value>, ApiError> {
            self.calls.borrow_mut().push(call.to_string());
            self.script
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| panic!("unscripted call: {call}"))
        }
    }

    impl ChatApi for ScriptedApi {
        async fn send_message(
            &self,
            _token: &str,
            _message: &str,
            _session_id: Option<&str>,
        ) -> Result<ApiResponse<Value>, ApiError> {
            self.next("send_message")
        }

        async fn send_message_with_files(
            &self,
            _token: &str,
            _message: &str,
            _session_id: Option<&str>,
            _files: &[FileUpload],
        ) -> Result<ApiResponse<Value>, ApiError> {
            self.next("send_message_with_files")
        }

        async fn get_history(&self, _token: &str) -> Result<ApiResponse<Value>, ApiError> {
            self.next("get_history")
        }

        async fn new_session(&self, _token: &str) -> Result<ApiResponse<Value>, ApiError> {
            self.next("new_session")
        }

        async fn get_session(
            &self,
            _token: &str,
            _session_id: &str,
        ) -> Result<ApiResponse<Value>, ApiError> {
            self.next("get_session")
        }

        async fn delete_conversation(
            &self,
            _token: &str,
            _session_id: &str,
        ) -> Result<ApiResponse<Value>, ApiError> {
            self.next("delete_conversation")
        }

        async fn get_favorites(&self, _token: &str) -> Result<ApiResponse<Value>, ApiError> {
            self.next("get_favorites")
        }

        async fn toggle_favorite(
            &self,
            _token: &str,
            _message_id: &str,
        ) -> Result<ApiResponse<Value>, ApiError> {
            self.next("toggle_favorite")
        }

        async fn remove_favorite(
            &self,
            _token: &str,
            _message_id: &str,
        ) -> Result<ApiResponse<Value>, ApiError> {
            self.next("remove_favorite")
        }
    }

    fn orchestrator(
        script: Vec<Result<ApiResponse<Value>, ApiError>>,
    ) -> ChatOrchestrator<ScriptedApi> {
        ChatOrchestrator::new(
            ScriptedApi::new(script),
            "test-token".to_string(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_blank_message_makes_no_api_call() {
        let mut orch = orchestrator(vec![]);
        assert!(!orch.send_message("   ").await);
        assert!(orch.messages.is_empty());
        assert!(orch.api.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_successful_send_confirms_and_appends_reply() {
        let mut orch = orchestrator(vec![
            Ok(ApiResponse::ok(json!({
                "sessionId": "srv-42",
                "response": "A pip is the smallest price move."
            }))),
            // sidebar refresh after the send settles
            Ok(ApiResponse::ok(json!([{"session_id": "srv-42", "first_message": "what is a pip?"}]))),
        ]);

        assert!(orch.send_message("what is a pip?").await);
        assert_eq!(orch.messages.len(), 2);
        assert_eq!(orch.messages[0].role, Role::User);
        assert_eq!(orch.messages[0].delivery, Delivery::Confirmed);
        assert_eq!(orch.messages[1].role, Role::Bot);
        assert!(orch.messages[1].content.contains("smallest price move"));
        assert_eq!(orch.current_session_id.as_deref(), Some("srv-42"));
        assert_eq!(orch.chat_history.len(), 1);
        assert!(orch.toasts.is_empty());
    }

    #[tokio::test]
    async fn test_send_reply_object_builds_bot_message_from_its_fields() {
        let mut orch = orchestrator(vec![
            Ok(ApiResponse::ok(json!({
                "sessionId": "s1",
                "message": {
                    "id": 7,
                    "content": "A pip is the smallest price move.",
                    "timestamp": "2026-08-01 09:00:00"
                }
            }))),
            Ok(ApiResponse::ok(json!([]))),
        ]);

        assert!(orch.send_message("what is a pip?").await);
        assert_eq!(orch.messages.len(), 2);
        assert_eq!(orch.messages[1].role, Role::Bot);
        assert_eq!(orch.messages[1].id, "7");
        assert_eq!(orch.messages[1].content, "A pip is the smallest price move.");
    }

    #[tokio::test]
    async fn test_rate_limited_send_keeps_text_and_raises_one_toast() {
        let mut orch = orchestrator(vec![Err(ApiError::RateLimited)]);

        assert!(!orch.send_message("hello").await);
        // the user's text stays, marked Failed, plus one explanatory bot reply
        assert_eq!(orch.messages.len(), 2);
        assert_eq!(orch.messages[0].content, "hello");
        assert_eq!(orch.messages[0].delivery, Delivery::Failed);
        assert_eq!(orch.messages[1].role, Role::Bot);
        assert!(orch.messages[1].content.contains("Too many requests"));

        let active = orch.toasts.active().to_vec();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, ToastKind::Error);
        assert_eq!(active[0].message, orch.messages[1].content);
    }

    #[tokio::test]
    async fn test_network_failure_translates_to_user_language() {
        let mut orch = orchestrator(vec![Err(ApiError::Network(
            "connection refused".to_string(),
        ))]);

        orch.send_message("hi").await;
        assert!(orch.messages[1].content.contains("internet connection"));
    }

    #[tokio::test]
    async fn test_new_session_clears_transcript_and_adopts_id() {
        let mut orch = orchestrator(vec![
            Ok(ApiResponse::ok(json!({"sessionId": "s1", "response": "hi"}))),
            Ok(ApiResponse::ok(json!([]))),
            Ok(ApiResponse::ok(json!({"sessionId": "s2"}))),
            Ok(ApiResponse::ok(json!([{"session_id": "s1", "first_message": "first"}]))),
        ]);

        orch.send_message("first").await;
        assert!(!orch.messages.is_empty());

        assert!(orch.new_session().await);
        assert!(orch.messages.is_empty());
        assert_eq!(orch.current_session_id.as_deref(), Some("s2"));
        assert_eq!(orch.chat_history.len(), 1);
    }

    #[tokio::test]
    async fn test_load_session_replaces_transcript_only_on_success() {
        let mut orch = orchestrator(vec![
            Ok(ApiResponse::ok(json!({"messages": [
                {"id": "1", "content": "old question", "type": "user"},
                {"id": "2", "content": "old answer", "type": "assistant"}
            ]}))),
            Err(ApiError::ServerFault(503)),
        ]);

        assert!(orch.load_session("stored-1").await);
        assert_eq!(orch.messages.len(), 2);
        assert_eq!(orch.current_session_id.as_deref(), Some("stored-1"));

        // failed load leaves the loaded transcript untouched
        assert!(!orch.load_session("stored-2").await);
        assert_eq!(orch.messages.len(), 2);
        assert_eq!(orch.current_session_id.as_deref(), Some("stored-1"));
        assert_eq!(orch.toasts.active().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_active_session_clears_transcript() {
        let mut orch = orchestrator(vec![
            Ok(ApiResponse::ok(json!({"sessionId": "s1", "response": "reply"}))),
            Ok(ApiResponse::ok(json!([{"session_id": "s1", "first_message": "msg"}]))),
            Ok(ApiResponse::<Value>::ok(json!({}))),
            Ok(ApiResponse::ok(json!([]))),
        ]);

        orch.send_message("msg").await;
        assert!(orch.delete_conversation("s1").await);
        assert!(orch.messages.is_empty());
        assert!(orch.current_session_id.is_none());
        assert!(orch.chat_history.is_empty());
    }

    #[tokio::test]
    async fn test_delete_background_session_keeps_transcript() {
        let mut orch = orchestrator(vec![
            Ok(ApiResponse::ok(json!({"sessionId": "s1", "response": "reply"}))),
            Ok(ApiResponse::ok(json!([{"session_id": "s1", "first_message": "msg"}]))),
            Ok(ApiResponse::<Value>::ok(json!({}))),
            Ok(ApiResponse::ok(json!([{"session_id": "s1", "first_message": "msg"}]))),
        ]);

        orch.send_message("msg").await;
        let before = orch.messages.len();
        assert!(orch.delete_conversation("other-session").await);
        assert_eq!(orch.messages.len(), before);
        assert_eq!(orch.current_session_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_toggle_favorite_flips_only_target() {
        let mut orch = orchestrator(vec![
            Ok(ApiResponse::ok(json!({"messages": [
                {"id": "m1", "content": "a", "type": "assistant"},
                {"id": "m2", "content": "b", "type": "assistant"}
            ]}))),
            Ok(ApiResponse::<Value>::ok(json!({}))),
            Ok(ApiResponse::ok(json!([{"id": "m2", "content": "b"}]))),
        ]);

        orch.load_session("s").await;
        assert!(orch.toggle_favorite("m2").await);

        assert!(!orch.messages[0].is_favorite);
        assert!(orch.messages[1].is_favorite);
        assert_eq!(orch.favorites.len(), 1);
        assert_eq!(orch.favorites[0].id, "m2");
    }

    #[tokio::test]
    async fn test_toggle_favorite_keeps_server_reported_state() {
        let mut orch = orchestrator(vec![
            Ok(ApiResponse::ok(json!({"messages": [
                {"id": "m1", "content": "a", "type": "assistant", "isFavorite": true}
            ]}))),
            Ok(ApiResponse::ok(json!({"isFavorite": true}))),
            Ok(ApiResponse::ok(json!([{"id": "m1", "content": "a"}]))),
        ]);

        orch.load_session("s").await;
        assert!(orch.toggle_favorite("m1").await);

        // the server says favorited; the locally-set flag must not flip off
        assert!(orch.messages[0].is_favorite);
        assert_eq!(orch.favorites.len(), 1);
        assert_eq!(orch.favorites[0].id, "m1");
    }

    #[tokio::test]
    async fn test_unfavorite_prunes_projection_without_refetch() {
        let mut orch = orchestrator(vec![
            Ok(ApiResponse::ok(json!({"messages": [
                {"id": "m1", "content": "a", "type": "assistant", "isFavorite": true}
            ]}))),
            Ok(ApiResponse::<Value>::ok(json!({}))),
        ]);

        orch.load_session("s").await;
        orch.favorites = vec![FavoriteMessage {
            id: "m1".to_string(),
            content: "a".to_string(),
            original_message: String::new(),
            created_at: chrono::Utc::now(),
        }];

        assert!(orch.toggle_favorite("m1").await);
        assert!(!orch.messages[0].is_favorite);
        assert!(orch.favorites.is_empty());
        // no get_favorites call happened on the unfavorite direction
        assert!(!orch.api.calls.borrow().iter().any(|c| c == "get_favorites"));
    }

    #[tokio::test]
    async fn test_send_with_files_rewrites_user_message_from_server() {
        let mut orch = orchestrator(vec![
            Ok(ApiResponse::ok(json!({
                "sessionId": "s9",
                "userMessage": {
                    "id": "u77",
                    "content": "see chart",
                    "type": "user",
                    "files": [{
                        "original_name": "chart.png",
                        "file_name": "abc123.png",
                        "file_path": "/uploads/abc123.png",
                        "file_size": 1024,
                        "mime_type": "image/png",
                        "url": "https://cdn.example.com/abc123.png"
                    }]
                },
                "message": {"id": "b78", "content": "Nice uptrend."}
            }))),
            Ok(ApiResponse::ok(json!([]))),
        ]);

        let file = FileUpload {
            file_name: "chart.png".to_string(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
            mime_type: "image/png".to_string(),
        };
        assert!(orch.send_message_with_files("see chart", vec![file]).await);

        assert_eq!(orch.messages.len(), 2);
        assert_eq!(orch.messages[0].role, Role::User);
        assert_eq!(orch.messages[0].id, "u77");
        assert_eq!(orch.messages[0].delivery, Delivery::Confirmed);
        assert_eq!(orch.messages[0].attachments.len(), 1);
        assert_eq!(orch.messages[0].attachments[0].original_name, "chart.png");
        assert_eq!(orch.messages[1].role, Role::Bot);
        assert_eq!(orch.messages[1].id, "b78");
        assert_eq!(orch.messages[1].content, "Nice uptrend.");
        assert_eq!(orch.current_session_id.as_deref(), Some("s9"));
    }

    #[tokio::test]
    async fn test_send_with_files_failure_marks_pending_failed() {
        let mut orch = orchestrator(vec![Err(ApiError::Http {
            status: 413,
            message: String::new(),
        })]);

        let file = FileUpload {
            file_name: "huge.bin".to_string(),
            bytes: vec![0; 8],
            mime_type: "application/octet-stream".to_string(),
        };
        assert!(!orch.send_message_with_files("big file", vec![file]).await);

        assert_eq!(orch.messages.len(), 2);
        assert_eq!(orch.messages[0].delivery, Delivery::Failed);
        assert!(orch.messages[1].content.contains("too large"));
        assert_eq!(orch.toasts.active().len(), 1);
    }

    #[tokio::test]
    async fn test_history_load_dedupes_rows() {
        let mut orch = orchestrator(vec![Ok(ApiResponse::ok(json!([
            {"session_id": "s1", "first_message": "early"},
            {"session_id": "s2", "first_message": "other"},
            {"session_id": "s1", "first_message": "late duplicate"}
        ])))]);

        assert!(orch.load_chat_history().await);
        assert_eq!(orch.chat_history.len(), 2);
        assert_eq!(orch.chat_history[0].first_message, "early");
    }

    #[tokio::test]
    async fn test_api_level_failure_raises_toast_with_server_message() {
        let mut orch = orchestrator(vec![Ok(ApiResponse::err("Maintenance window"))]);

        assert!(!orch.new_session().await);
        let active = orch.toasts.active().to_vec();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message, "Maintenance window");
    }
}
