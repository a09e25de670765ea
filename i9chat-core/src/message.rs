//! Chat transcript model: conversations and the messages appended to them.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    Text,
    DeliveryForm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// RFC 3339, microsecond precision, UTC. Sorts lexicographically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
}

impl UiMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let now = Utc::now();
        let prefix = match role {
            Role::User => "user-message",
            Role::Assistant => "bot-message",
            Role::System => "system-message",
        };
        Self {
            id: format!("{}-{}-{:08x}", prefix, now.timestamp_millis(), rand::random::<u32>()),
            role,
            content: content.into(),
            timestamp: Some(now.to_rfc3339_opts(SecondsFormat::Micros, true)),
            kind: Some(MessageKind::Text),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "avatarUrl", default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantsInfo {
    #[serde(default)]
    pub bot: Participant,
    #[serde(default)]
    pub user: Participant,
}

/// A conversation document.
///
/// `messages` is not part of the document itself; it is filled from the
/// `messages` sub-collection when the conversation is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(skip)]
    pub messages: Vec<UiMessage>,
    #[serde(rename = "participantsInfo", default)]
    pub participants_info: ParticipantsInfo,
    #[serde(rename = "isBotPaused", default)]
    pub is_bot_paused: bool,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            user_id: user_id.into(),
            messages: Vec::new(),
            participants_info: ParticipantsInfo::default(),
            is_bot_paused: false,
            created_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }

    pub fn with_participants(mut self, info: ParticipantsInfo) -> Self {
        self.participants_info = info;
        self
    }

    /// True until the first user message is appended.
    pub fn is_fresh(&self) -> bool {
        !self.messages.iter().any(|m| m.role == Role::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_carry_role_prefix() {
        let u = UiMessage::user("oi");
        let b = UiMessage::assistant("olá");
        assert!(u.id.starts_with("user-message-"));
        assert!(b.id.starts_with("bot-message-"));
        assert_ne!(u.id, b.id);
        assert!(u.timestamp.as_deref().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_message_kind_wire_names() {
        let m = UiMessage::assistant("form").with_kind(MessageKind::DeliveryForm);
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["type"], "delivery-form");
        assert_eq!(v["role"], "assistant");
    }

    #[test]
    fn test_conversation_doc_omits_messages() {
        let mut c = Conversation::new("c1", "demo", "Nova conversa");
        c.messages.push(UiMessage::user("oi"));
        let v = serde_json::to_value(&c).unwrap();
        assert!(v.get("messages").is_none());
        assert_eq!(v["userId"], "demo");
        assert_eq!(v["isBotPaused"], false);
        assert!(!c.is_fresh());
    }
}
