use std::sync::Arc;

use futures_util::FutureExt;
use ratatui::layout::Rect;
use tokio::task::JoinHandle;

use crate::chat_client::{ChatBackend, ChatReply, RequestFailure};
use crate::config::Config;
use crate::conversation::ConversationState;

type ReplyTask = JoinHandle<Result<ChatReply, RequestFailure>>;

/// The chat panel controller.
///
/// Owns the conversation, the backend and the single in-flight request.
pub struct App {
    pub should_quit: bool,
    pub conversation: ConversationState,

    // Static chrome
    pub title: String,
    pub placeholder: String,
    pub endpoint: String,

    backend: Arc<dyn ChatBackend>,
    pending: Option<ReplyTask>,

    // Message list scrolling
    pub chat_scroll: u16,
    pub follow_tail: bool,
    pub chat_height: u16,
    pub total_chat_lines: u16,
    pub chat_area: Option<Rect>,
    pub send_area: Option<Rect>,

    pub animation_frame: u8, // 0-2, which loading dot is lit
}

impl App {
    pub fn new(config: &Config, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            should_quit: false,
            conversation: ConversationState::new(Some(config.greeting())),

            title: config.title().to_string(),
            placeholder: config.placeholder().to_string(),
            endpoint: config.endpoint().to_string(),

            backend,
            pending: None,

            chat_scroll: 0,
            follow_tail: true,
            chat_height: 0,
            total_chat_lines: 0,
            chat_area: None,
            send_area: None,

            animation_frame: 0,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        self.conversation.is_awaiting()
    }

    /// Send the draft if it is non-blank and nothing is in flight.
    ///
    /// Returns whether a request was started.
    pub fn submit(&mut self) -> bool {
        let Some(message) = self.conversation.begin_submit() else {
            return false;
        };

        tracing::info!(chars = message.chars().count(), "submitting chat message");
        self.follow_tail = true;
        self.animation_frame = 0;

        let backend = Arc::clone(&self.backend);
        self.pending = Some(tokio::spawn(async move { backend.send(&message).await }));
        true
    }

    /// Collect the reply if the request task has finished.
    pub fn poll_reply(&mut self) -> bool {
        let Some(mut handle) = self.pending.take() else {
            return false;
        };

        if !handle.is_finished() {
            self.pending = Some(handle);
            return false;
        }

        let polled = (&mut handle).now_or_never();
        match polled {
            Some(Ok(outcome)) => self.finish_reply(outcome),
            Some(Err(join_error)) => {
                self.finish_reply(Err(RequestFailure::Aborted(join_error.to_string())))
            }
            None => {
                self.pending = Some(handle);
                return false;
            }
        }
        true
    }

    /// Every outcome funnels through here, so the panel always returns to idle.
    fn finish_reply(&mut self, outcome: Result<ChatReply, RequestFailure>) {
        let reply = match outcome {
            Ok(reply) => {
                if reply.response.is_none() {
                    tracing::warn!("chat reply had no string `response` field");
                }
                tracing::debug!("chat request settled");
                Some(reply.into_content())
            }
            Err(error) => {
                tracing::error!(%error, "chat request failed");
                None
            }
        };

        self.conversation.settle(reply);
        self.follow_tail = true;
    }

    /// Called by the Tick event
    pub fn tick(&mut self) {
        self.poll_reply();
        if self.is_awaiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn max_chat_scroll(&self) -> u16 {
        self.total_chat_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_chat_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        // Reaching the bottom re-attaches to new messages
        self.follow_tail = self.chat_scroll >= max;
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_page_up(&mut self) {
        self.scroll_up(self.chat_height.max(1));
    }

    pub fn scroll_page_down(&mut self) {
        self.scroll_down(self.chat_height.max(1));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::conversation::{FALLBACK_REPLY, Message, Phase, Role};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Backend double: replies with a canned result and counts calls.
    pub(crate) struct FakeBackend {
        reply: Option<String>,
        fail: bool,
        pub(crate) calls: AtomicUsize,
        pub(crate) last_message: std::sync::Mutex<Option<String>>,
        gate: Option<Arc<Notify>>,
    }

    impl FakeBackend {
        pub(crate) fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self::build(Some(text.to_string()), false, None))
        }

        pub(crate) fn missing_field() -> Arc<Self> {
            Arc::new(Self::build(None, false, None))
        }

        pub(crate) fn failing() -> Arc<Self> {
            Arc::new(Self::build(None, true, None))
        }

        /// Holds every request until the gate is notified.
        pub(crate) fn gated(text: &str, gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self::build(Some(text.to_string()), false, Some(gate)))
        }

        fn build(reply: Option<String>, fail: bool, gate: Option<Arc<Notify>>) -> Self {
            Self {
                reply,
                fail,
                calls: AtomicUsize::new(0),
                last_message: std::sync::Mutex::new(None),
                gate,
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn send(&self, message: &str) -> Result<ChatReply, RequestFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_message.lock().unwrap() = Some(message.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                let err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
                return Err(RequestFailure::Decode(err));
            }
            Ok(ChatReply {
                response: self.reply.clone(),
            })
        }
    }

    struct PanickingBackend;

    #[async_trait]
    impl ChatBackend for PanickingBackend {
        async fn send(&self, _message: &str) -> Result<ChatReply, RequestFailure> {
            panic!("backend blew up");
        }
    }

    pub(crate) fn app_with(backend: Arc<dyn ChatBackend>) -> App {
        let config = Config {
            greeting: Some(String::new()),
            ..Config::new()
        };
        App::new(&config, backend)
    }

    /// Drive ticks until the in-flight request settles.
    pub(crate) async fn settle(app: &mut App) {
        for _ in 0..200 {
            if app.poll_reply() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("request never settled");
    }

    fn type_draft(app: &mut App, text: &str) {
        app.conversation.insert_str(text);
    }

    #[tokio::test]
    async fn test_successful_reply_is_appended() {
        let backend = FakeBackend::replying("Hi there");
        let mut app = app_with(backend.clone());
        type_draft(&mut app, "Hello");

        assert!(app.submit());
        assert_eq!(app.conversation.messages(), &[Message::user("Hello")]);
        assert!(app.is_awaiting());

        settle(&mut app).await;
        assert_eq!(
            app.conversation.messages(),
            &[Message::user("Hello"), Message::assistant("Hi there")]
        );
        assert_eq!(app.conversation.phase(), Phase::Idle);
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.last_message.lock().unwrap().as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_failure_appends_fallback() {
        let mut app = app_with(FakeBackend::failing());
        type_draft(&mut app, "Hello");
        app.submit();
        settle(&mut app).await;

        let last = app.conversation.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, FALLBACK_REPLY);
        assert!(!app.is_awaiting());
    }

    #[tokio::test]
    async fn test_panicking_task_appends_fallback() {
        let mut app = app_with(Arc::new(PanickingBackend));
        type_draft(&mut app, "Hello");
        app.submit();
        settle(&mut app).await;

        assert_eq!(app.conversation.messages().last().unwrap().content, FALLBACK_REPLY);
        assert!(!app.is_awaiting());
    }

    #[tokio::test]
    async fn test_missing_response_field_renders_empty() {
        let mut app = app_with(FakeBackend::missing_field());
        type_draft(&mut app, "Hello");
        app.submit();
        settle(&mut app).await;

        assert_eq!(app.conversation.messages().last(), Some(&Message::assistant("")));
    }

    #[tokio::test]
    async fn test_blank_draft_makes_no_call() {
        let backend = FakeBackend::replying("unused");
        let mut app = app_with(backend.clone());
        type_draft(&mut app, "   \n ");

        assert!(!app.submit());
        tokio::task::yield_now().await;
        assert!(app.conversation.messages().is_empty());
        assert_eq!(backend.call_count(), 0);
        assert!(!app.poll_reply());
    }

    #[tokio::test]
    async fn test_submit_while_awaiting_is_ignored() {
        let gate = Arc::new(Notify::new());
        let backend = FakeBackend::gated("done", gate.clone());
        let mut app = app_with(backend.clone());

        type_draft(&mut app, "first");
        assert!(app.submit());
        // Draft edits are refused too, so force a second attempt through submit
        assert!(!app.conversation.insert_str("second"));
        assert!(!app.submit());

        // Let the spawned task reach the gate
        for _ in 0..50 {
            if backend.call_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!app.poll_reply());
        assert!(app.is_awaiting());

        gate.notify_one();
        settle(&mut app).await;
        assert_eq!(backend.call_count(), 1);
        assert_eq!(app.conversation.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_tick_animates_only_while_awaiting() {
        let gate = Arc::new(Notify::new());
        let mut app = app_with(FakeBackend::gated("done", gate.clone()));

        app.tick();
        assert_eq!(app.animation_frame, 0);

        type_draft(&mut app, "go");
        app.submit();
        app.tick();
        app.tick();
        assert_eq!(app.animation_frame, 2);
        app.tick();
        assert_eq!(app.animation_frame, 0);

        gate.notify_one();
        settle(&mut app).await;
    }

    #[test]
    fn test_scrolling_detaches_and_reattaches_tail() {
        let mut app = App::new(&Config::new(), FakeBackend::replying("x"));
        app.chat_height = 10;
        app.total_chat_lines = 30;
        app.chat_scroll = app.max_chat_scroll();

        app.scroll_up(5);
        assert!(!app.follow_tail);
        assert_eq!(app.chat_scroll, 15);

        app.scroll_half_page_down();
        assert_eq!(app.chat_scroll, 20);
        assert!(app.follow_tail);

        app.scroll_page_down();
        assert_eq!(app.chat_scroll, 20);
    }
}
