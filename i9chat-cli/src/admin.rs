//! Operator commands: inspect conversations and take over from the bot.

use anyhow::{Context, Result};
use i9chat_core::{Conversation, Role, UiMessage};
use i9chat_store::{conversations, DocumentStore};

pub fn list(store: &DocumentStore, user_id: &str, search: Option<&str>) -> Result<()> {
    let found = conversations::list_conversations(store, user_id, search)?;
    if found.is_empty() {
        println!("No conversations for {user_id}.");
        return Ok(());
    }
    for c in &found {
        println!("{}", conversation_row(c));
    }
    Ok(())
}

pub fn show(store: &DocumentStore, id: &str) -> Result<()> {
    let c = load(store, id)?;
    print!("{}", transcript(&c));
    Ok(())
}

pub fn set_paused(store: &DocumentStore, id: &str, paused: bool) -> Result<()> {
    let c = conversations::set_bot_paused(store, id, paused)
        .with_context(|| format!("update conversation {id}"))?;
    if c.is_bot_paused {
        println!("Bot paused for {} ({}). Reply with: i9chat admin reply {} <text>", c.title, c.id, c.id);
    } else {
        println!("Bot resumed for {} ({}).", c.title, c.id);
    }
    Ok(())
}

/// Post a message as the assistant.
pub fn reply(store: &DocumentStore, id: &str, text: &str) -> Result<UiMessage> {
    let c = load(store, id)?;
    let text = text.trim();
    anyhow::ensure!(!text.is_empty(), "reply text is empty");
    if !c.is_bot_paused {
        tracing::warn!(conversation = id, "operator reply while the bot is active");
    }
    let msg = UiMessage::assistant(text);
    conversations::append_message(store, &c.id, &msg)?;
    tracing::info!(conversation = id, message = %msg.id, "operator reply stored");
    Ok(msg)
}

fn load(store: &DocumentStore, id: &str) -> Result<Conversation> {
    conversations::load_conversation(store, id)?.with_context(|| format!("conversation {id} not found"))
}

/// RFC 3339 to local `dd/mm/yyyy HH:MM`; anything unparseable is shown as is.
fn local_time(ts: Option<&str>) -> String {
    match ts {
        Some(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&chrono::Local).format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|_| s.to_string()),
        None => "-".to_string(),
    }
}

fn conversation_row(c: &Conversation) -> String {
    format!(
        "{}  {}  {}{}",
        c.id,
        local_time(c.created_at.as_deref()),
        c.title,
        if c.is_bot_paused { "  [pausado]" } else { "" }
    )
}

fn transcript(c: &Conversation) -> String {
    let mut out = format!("# {}\nid: {}\nuser: {}\n", c.title, c.id, c.user_id);
    if c.is_bot_paused {
        out.push_str("bot: paused\n");
    }
    out.push('\n');
    for m in &c.messages {
        let who = match m.role {
            Role::User => c
                .participants_info
                .user
                .display_name
                .as_deref()
                .unwrap_or("user"),
            Role::Assistant => c
                .participants_info
                .bot
                .display_name
                .as_deref()
                .unwrap_or("bot"),
            Role::System => "system",
        };
        out.push_str(&format!(
            "[{}] {}: {}\n",
            local_time(m.timestamp.as_deref()),
            who,
            m.content
        ));
    }
    out
}
