//! UI-agnostic conversation state
//!
//! Holds the message thread, the draft being typed and the request phase.
//! Nothing in here knows about the terminal or the network; the controller in
//! `app.rs` drives the transitions.

use serde::{Deserialize, Serialize};

/// Assistant reply shown whenever a request fails for any reason.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// Greeting the conversation opens with unless configured otherwise.
pub const DEFAULT_GREETING: &str =
    "Hello! I can help you with questions about Crustdata APIs. What would you like to know?";

/// One turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Who sent a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Assistant",
        }
    }
}

/// Whether a request is currently outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingResponse,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    draft: String,
    // Cursor position in chars, not bytes
    cursor: usize,
    phase: Phase,
}

impl ConversationState {
    /// Start a conversation, optionally opened by an assistant greeting.
    pub fn new(greeting: Option<&str>) -> Self {
        let messages = greeting
            .filter(|g| !g.trim().is_empty())
            .map(|g| vec![Message::assistant(g)])
            .unwrap_or_default();

        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_awaiting(&self) -> bool {
        self.phase == Phase::AwaitingResponse
    }

    /// True when a submit would be accepted right now.
    pub fn can_submit(&self) -> bool {
        self.phase == Phase::Idle && !self.draft.trim().is_empty()
    }

    /// Move Idle -> AwaitingResponse.
    ///
    /// Appends the draft as a user message, clears the input and returns the
    /// text to send. Returns `None`, leaving everything untouched, when the
    /// draft is blank or a request is already in flight.
    pub fn begin_submit(&mut self) -> Option<String> {
        if !self.can_submit() {
            return None;
        }

        let outgoing = std::mem::take(&mut self.draft);
        self.cursor = 0;
        self.messages.push(Message::user(outgoing.clone()));
        self.phase = Phase::AwaitingResponse;
        Some(outgoing)
    }

    /// Move AwaitingResponse -> Idle, appending the assistant turn.
    ///
    /// `None` stands for a failed request and appends [`FALLBACK_REPLY`].
    /// Returns false (and changes nothing) if no request was outstanding.
    pub fn settle(&mut self, reply: Option<String>) -> bool {
        if self.phase != Phase::AwaitingResponse {
            return false;
        }

        self.phase = Phase::Idle;
        let content = reply.unwrap_or_else(|| FALLBACK_REPLY.to_string());
        self.messages.push(Message::assistant(content));
        true
    }

    // Draft editing. Every edit is refused while a request is in flight.

    pub fn insert_char(&mut self, c: char) -> bool {
        if self.is_awaiting() {
            return false;
        }
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.insert(byte_pos, c);
        self.cursor += 1;
        true
    }

    pub fn insert_str(&mut self, text: &str) -> bool {
        if self.is_awaiting() || text.is_empty() {
            return false;
        }
        // Terminals deliver pasted line breaks as \r or \r\n
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.insert_str(byte_pos, &normalized);
        self.cursor += normalized.chars().count();
        true
    }

    pub fn insert_newline(&mut self) -> bool {
        self.insert_char('\n')
    }

    pub fn backspace(&mut self) -> bool {
        if self.is_awaiting() || self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.remove(byte_pos);
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.is_awaiting() || self.cursor >= self.draft.chars().count() {
            return false;
        }
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.remove(byte_pos);
        true
    }

    pub fn move_left(&mut self) {
        if !self.is_awaiting() {
            self.cursor = self.cursor.saturating_sub(1);
        }
    }

    pub fn move_right(&mut self) {
        if !self.is_awaiting() {
            self.cursor = (self.cursor + 1).min(self.draft.chars().count());
        }
    }

    /// Jump to the start of the current draft line.
    pub fn move_home(&mut self) {
        if self.is_awaiting() {
            return;
        }
        let (_, col) = self.cursor_row_col();
        self.cursor -= col;
    }

    /// Jump to the end of the current draft line.
    pub fn move_end(&mut self) {
        if self.is_awaiting() {
            return;
        }
        let rest = self.draft.chars().skip(self.cursor);
        let to_eol = rest.take_while(|c| *c != '\n').count();
        self.cursor += to_eol;
    }

    /// Cursor location as (line, column), both counted in chars.
    pub fn cursor_row_col(&self) -> (usize, usize) {
        let mut row = 0;
        let mut col = 0;
        for c in self.draft.chars().take(self.cursor) {
            if c == '\n' {
                row += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (row, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> ConversationState {
        let mut state = ConversationState::new(None);
        state.insert_str(text);
        state
    }

    #[test]
    fn test_greeting_opens_conversation() {
        let state = ConversationState::new(Some(DEFAULT_GREETING));
        assert_eq!(state.messages(), &[Message::assistant(DEFAULT_GREETING)]);
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn test_blank_greeting_starts_empty() {
        assert!(ConversationState::new(Some("   ")).messages().is_empty());
        assert!(ConversationState::new(None).messages().is_empty());
    }

    #[test]
    fn test_submit_appends_user_message_and_clears_draft() {
        let mut state = typed("  How do I search people?  ");
        let outgoing = state.begin_submit();

        // Sent and stored as typed, not trimmed
        assert_eq!(outgoing.as_deref(), Some("  How do I search people?  "));
        assert_eq!(state.messages(), &[Message::user("  How do I search people?  ")]);
        assert_eq!(state.draft(), "");
        assert_eq!(state.cursor(), 0);
        assert!(state.is_awaiting());
    }

    #[test]
    fn test_blank_draft_is_rejected() {
        for draft in ["", "   ", "\n\t \n"] {
            let mut state = typed(draft);
            assert_eq!(state.begin_submit(), None);
            assert!(state.messages().is_empty());
            assert_eq!(state.draft(), draft);
            assert_eq!(state.phase(), Phase::Idle);
        }
    }

    #[test]
    fn test_submit_while_awaiting_is_rejected() {
        let mut state = typed("first");
        state.begin_submit();
        assert!(!state.insert_str("second"));
        assert_eq!(state.begin_submit(), None);
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn test_settle_success_appends_reply() {
        let mut state = typed("hi");
        state.begin_submit();
        assert!(state.settle(Some("Hi there".to_string())));
        assert_eq!(state.messages().last(), Some(&Message::assistant("Hi there")));
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn test_settle_failure_appends_fallback() {
        let mut state = typed("hi");
        state.begin_submit();
        assert!(state.settle(None));
        assert_eq!(state.messages().last(), Some(&Message::assistant(FALLBACK_REPLY)));
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn test_settle_without_request_is_ignored() {
        let mut state = ConversationState::new(None);
        assert!(!state.settle(Some("stray".to_string())));
        assert!(state.messages().is_empty());
    }

    #[test]
    fn test_editing_is_utf8_safe() {
        let mut state = typed("héllo");
        state.move_left();
        state.move_left();
        state.insert_char('ü');
        assert_eq!(state.draft(), "hélülo");
        state.backspace();
        state.backspace();
        assert_eq!(state.draft(), "hélo");
        state.delete();
        assert_eq!(state.draft(), "héo");
    }

    #[test]
    fn test_paste_normalizes_carriage_returns() {
        let state = typed("one\r\ntwo\rthree");
        assert_eq!(state.draft(), "one\ntwo\nthree");
        assert_eq!(state.cursor(), 13);
    }

    #[test]
    fn test_home_end_are_line_relative() {
        let mut state = typed("first\nsecond");
        assert_eq!(state.cursor_row_col(), (1, 6));
        state.move_home();
        assert_eq!(state.cursor_row_col(), (1, 0));
        state.move_left();
        assert_eq!(state.cursor_row_col(), (0, 5));
        state.move_home();
        assert_eq!(state.cursor(), 0);
        state.move_end();
        assert_eq!(state.cursor(), 5);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::user("hey")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hey"}"#);
    }
}
