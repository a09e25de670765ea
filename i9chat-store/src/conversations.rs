//! Conversation documents and their `messages` sub-collection.

use i9chat_core::{Conversation, Role, UiMessage};
use tracing::info;

use crate::document::DocumentStore;
use crate::error::{Result, StoreError};

pub const COLLECTION: &str = "conversations";

fn messages_collection(conversation_id: &str) -> String {
    format!("{COLLECTION}/{conversation_id}/messages")
}

/// Persist the conversation document. Messages are written separately.
pub fn save_conversation(store: &DocumentStore, conversation: &Conversation) -> Result<()> {
    store.set(COLLECTION, &conversation.id, conversation)
}

/// Load a conversation with its messages sorted by timestamp.
pub fn load_conversation(store: &DocumentStore, id: &str) -> Result<Option<Conversation>> {
    let Some(mut conversation) = store.get::<Conversation>(COLLECTION, id)? else {
        return Ok(None);
    };
    conversation.messages = load_messages(store, id)?;
    Ok(Some(conversation))
}

pub fn load_messages(store: &DocumentStore, conversation_id: &str) -> Result<Vec<UiMessage>> {
    let mut messages: Vec<UiMessage> = store.list(&messages_collection(conversation_id))?;
    // A reply stamped in the same instant as the question still follows it.
    messages.sort_by(|a, b| {
        a.timestamp
            .as_deref()
            .unwrap_or("")
            .cmp(b.timestamp.as_deref().unwrap_or(""))
            .then_with(|| role_rank(a.role).cmp(&role_rank(b.role)))
    });
    Ok(messages)
}

fn role_rank(role: Role) -> u8 {
    match role {
        Role::System => 0,
        Role::User => 1,
        Role::Assistant => 2,
    }
}

pub fn append_message(store: &DocumentStore, conversation_id: &str, message: &UiMessage) -> Result<()> {
    store.set(&messages_collection(conversation_id), &message.id, message)
}

/// Conversations belonging to `user_id`, oldest first, without messages.
///
/// `title_filter` is a case-insensitive substring match on the title.
pub fn list_conversations(
    store: &DocumentStore,
    user_id: &str,
    title_filter: Option<&str>,
) -> Result<Vec<Conversation>> {
    let needle = title_filter.map(str::to_lowercase);
    let mut out: Vec<Conversation> = store
        .list::<Conversation>(COLLECTION)?
        .into_iter()
        .filter(|c| c.user_id == user_id)
        .filter(|c| match &needle {
            Some(n) => c.title.to_lowercase().contains(n.as_str()),
            None => true,
        })
        .collect();
    out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(out)
}

fn update<F>(store: &DocumentStore, id: &str, f: F) -> Result<Conversation>
where
    F: FnOnce(&mut Conversation),
{
    let mut conversation = store
        .get::<Conversation>(COLLECTION, id)?
        .ok_or_else(|| StoreError::NotFound(format!("conversation {id}")))?;
    f(&mut conversation);
    save_conversation(store, &conversation)?;
    Ok(conversation)
}

/// Operator takeover: while paused the bot does not answer.
pub fn set_bot_paused(store: &DocumentStore, id: &str, paused: bool) -> Result<Conversation> {
    info!(conversation = id, paused, "bot pause toggled");
    update(store, id, |c| c.is_bot_paused = paused)
}

pub fn set_title(store: &DocumentStore, id: &str, title: &str) -> Result<Conversation> {
    update(store, id, |c| c.title = title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, DocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_messages_come_back_in_timestamp_order() {
        let (_dir, store) = store();
        let c = Conversation::new("c1", "demo", "Nova conversa");
        save_conversation(&store, &c).unwrap();

        let mut late = UiMessage::assistant("segunda");
        late.id = "a-late".to_string();
        late.timestamp = Some("2026-01-01T10:00:01.000Z".to_string());
        let mut early = UiMessage::user("primeira");
        early.id = "z-early".to_string();
        early.timestamp = Some("2026-01-01T10:00:00.000Z".to_string());
        append_message(&store, "c1", &late).unwrap();
        append_message(&store, "c1", &early).unwrap();

        let loaded = load_conversation(&store, "c1").unwrap().unwrap();
        let roles: Vec<Role> = loaded.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(loaded.messages[0].content, "primeira");
    }

    #[test]
    fn test_list_filters_by_user_and_title() {
        let (_dir, store) = store();
        save_conversation(&store, &Conversation::new("c1", "demo", "Consulta de entrega")).unwrap();
        save_conversation(&store, &Conversation::new("c2", "demo", "Nova entrega")).unwrap();
        save_conversation(&store, &Conversation::new("c3", "other", "Consulta")).unwrap();

        assert_eq!(list_conversations(&store, "demo", None).unwrap().len(), 2);
        let hits = list_conversations(&store, "demo", Some("CONSULTA")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "c1");
    }

    #[test]
    fn test_pause_and_title_updates_persist() {
        let (_dir, store) = store();
        save_conversation(&store, &Conversation::new("c1", "demo", "Nova conversa")).unwrap();

        set_bot_paused(&store, "c1", true).unwrap();
        set_title(&store, "c1", "Entrega atrasada").unwrap();

        let c = load_conversation(&store, "c1").unwrap().unwrap();
        assert!(c.is_bot_paused);
        assert_eq!(c.title, "Entrega atrasada");
        assert!(matches!(
            set_bot_paused(&store, "missing", true),
            Err(StoreError::NotFound(_))
        ));
    }
}
