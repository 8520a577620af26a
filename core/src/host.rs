//! Types at the boundary with the messaging host.
//!
//! The host delivers messages and owns per-conversation state; routing
//! only reads the message text. These types give hosts and handlers a
//! shared vocabulary without tying the crate to any transport.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message delivered by the host.
///
/// Deserializes from JSON with only `chat_id` and `text` present; the rest
/// falls back to defaults.
///
/// # Examples
///
/// ```
/// use chain_command_core::InboundMessage;
///
/// let msg: InboundMessage = serde_json::from_str(r#"{"chat_id": 7, "text": "/git status"}"#).unwrap();
/// assert_eq!(msg.chat_id, 7);
/// assert_eq!(msg.text.as_deref(), Some("/git status"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub message_id: i64,
    pub chat_id: i64,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
    /// Absent for non-text messages (photos, stickers, ...).
    #[serde(default)]
    pub text: Option<String>,
}

impl InboundMessage {
    /// Creates a text message stamped with the current time.
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            message_id: 0,
            chat_id,
            sender: None,
            date: Utc::now(),
            text: Some(text.into()),
        }
    }
}

/// Opaque per-conversation key/value store.
///
/// The host decides how (and whether) it is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatData(BTreeMap<String, serde_json::Value>);

impl ChatData {
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) -> Option<serde_json::Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Stock handler context: the message being handled, its conversation's
/// data and the replies produced so far.
#[derive(Debug, Clone)]
pub struct HostContext {
    pub message: InboundMessage,
    pub chat_data: ChatData,
    replies: Vec<String>,
}

impl HostContext {
    pub fn new(message: InboundMessage, chat_data: ChatData) -> Self {
        Self {
            message,
            chat_data,
            replies: Vec::new(),
        }
    }

    /// Queues a reply for the host to send.
    pub fn reply(&mut self, text: impl Into<String>) {
        self.replies.push(text.into());
    }

    pub fn replies(&self) -> &[String] {
        &self.replies
    }

    /// Hands the queued replies and the (possibly updated) chat data back
    /// to the host.
    pub fn finish(self) -> (Vec<String>, ChatData) {
        (self.replies, self.chat_data)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_message_defaults() {
        let msg: InboundMessage = serde_json::from_str(r#"{"chat_id": 1}"#).unwrap();
        assert_eq!(msg.message_id, 0);
        assert!(msg.text.is_none());
        assert!(msg.sender.is_none());
    }

    #[test]
    fn test_chat_data_is_plain_json_object() {
        let mut data = ChatData::default();
        data.insert("subs", json!(["news"]));
        assert_eq!(serde_json::to_value(&data).unwrap(), json!({"subs": ["news"]}));
        assert_eq!(data.remove("subs"), Some(json!(["news"])));
        assert!(data.is_empty());
    }

    #[test]
    fn test_context_collects_replies() {
        let mut ctx = HostContext::new(InboundMessage::text(1, "/x"), ChatData::default());
        ctx.reply("one");
        ctx.chat_data.insert("seen", json!(true));
        ctx.reply(String::from("two"));
        let (replies, data) = ctx.finish();
        assert_eq!(replies, vec!["one", "two"]);
        assert_eq!(data.get("seen"), Some(&json!(true)));
    }
}
