//! Ordered transcript for one scenario.
//!
//! Messages get an explicit, monotonically increasing `seq` at append
//! time; ordering never depends on message ids or wall-clock time.

use crate::models::{ContextDetail, Message, Scenario};

/// Reply shown when the model call fails. The user's message stays in
/// the transcript.
pub const FAILURE_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// The transcript of one scenario chat.
#[derive(Debug, Clone)]
pub struct Conversation {
    scenario: Scenario,
    messages: Vec<Message>,
    next_seq: u64,
}

impl Conversation {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            messages: Vec::new(),
            next_seq: 0,
        }
    }

    /// Resume from previously stored messages. Later appends continue
    /// after the highest stored `seq`.
    pub fn from_messages(scenario: Scenario, mut messages: Vec<Message>) -> Self {
        messages.sort_by_key(|m| m.seq);
        let next_seq = messages.last().map(|m| m.seq + 1).unwrap_or(0);
        Self {
            scenario,
            messages,
            next_seq,
        }
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Messages in send order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub fn push_user(&mut self, text: &str) -> &Message {
        let seq = self.take_seq();
        self.messages.push(Message::user(text, seq));
        &self.messages[self.messages.len() - 1]
    }

    pub fn push_model(&mut self, text: &str, context: Option<ContextDetail>) -> &Message {
        let seq = self.take_seq();
        let mut message = Message::model(text, seq);
        message.context = context;
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Append the generic failure reply.
    pub fn push_failure(&mut self) -> &Message {
        self.push_model(FAILURE_REPLY, None)
    }

    /// Context of the most recent model reply that has one.
    pub fn last_context(&self) -> Option<&ContextDetail> {
        self.messages.iter().rev().find_map(|m| m.context.as_ref())
    }

    /// Messages newest first.
    pub fn recent_first(&self) -> Vec<&Message> {
        let mut out: Vec<&Message> = self.messages.iter().collect();
        out.sort_by(|a, b| b.seq.cmp(&a.seq));
        out
    }

    /// Start a new chat. Returns the archived transcript (empty if there
    /// was nothing to archive). Sequence numbers keep increasing.
    pub fn reset(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_seq_monotonic() {
        let mut conv = Conversation::new(Scenario::Normal);
        conv.push_user("a");
        conv.push_model("b", None);
        conv.push_user("c");
        let seqs: Vec<u64> = conv.messages().iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_recent_first() {
        let mut conv = Conversation::new(Scenario::Normal);
        conv.push_user("first");
        conv.push_model("second", None);
        let texts: Vec<&str> = conv.recent_first().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[test]
    fn test_reset_archives_and_keeps_counting() {
        let mut conv = Conversation::new(Scenario::Data);
        conv.push_user("q");
        conv.push_failure();
        let archived = conv.reset();
        assert_eq!(archived.len(), 2);
        assert_eq!(archived[1].text, FAILURE_REPLY);
        assert!(conv.is_empty());
        assert_eq!(conv.push_user("again").seq, 2);
    }

    #[test]
    fn test_from_messages_resumes_sequence() {
        let stored = vec![Message::model("b", 5), Message::user("a", 4)];
        let mut conv = Conversation::from_messages(Scenario::Search, stored);
        assert_eq!(conv.messages()[0].role, Role::User);
        assert_eq!(conv.push_user("c").seq, 6);
    }

    #[test]
    fn test_last_context() {
        let mut conv = Conversation::new(Scenario::Normal);
        assert!(conv.last_context().is_none());
        let ctx = ContextDetail {
            response_text: "hi".to_string(),
            ..Default::default()
        };
        conv.push_user("q");
        conv.push_model("hi", Some(ctx));
        conv.push_user("q2");
        assert_eq!(conv.last_context().unwrap().response_text, "hi");
    }
}
