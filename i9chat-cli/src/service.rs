use anyhow::{bail, Context, Result};
use i9chat_core::{
    handle_turn, summarize_title, Completer, Conversation, Delivery, MessageKind, Participant,
    ParticipantsInfo, Session, TurnRoute, UiMessage, DEFAULT_TITLE,
};
use i9chat_store::conversations;
use i9chat_store::{DocumentStore, StoreBackoffice};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

use crate::config::Config;

/// Result of one submitted user message.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub conversation_id: String,
    pub user_message: UiMessage,
    /// `None` while an operator has taken over the conversation.
    pub reply: Option<UiMessage>,
    pub route: Option<TurnRoute>,
    pub created: Option<Delivery>,
    /// First user message of the conversation; a title summary is due.
    pub first_message: bool,
}

/// One user's chat session: the conversation being written to, the wizard
/// state, and the backends a turn needs.
pub struct ChatService {
    store: DocumentStore,
    backoffice: StoreBackoffice,
    completer: Box<dyn Completer + Send>,
    session: Session,
    conversation: Option<Conversation>,
    summarize_titles: bool,
    participants: ParticipantsInfo,
    rng: StdRng,
}

impl ChatService {
    pub fn new(
        store: DocumentStore,
        user_id: &str,
        completer: Box<dyn Completer + Send>,
        rng: StdRng,
    ) -> Self {
        Self {
            backoffice: StoreBackoffice::new(store.clone(), user_id),
            store,
            completer,
            session: Session::new(user_id),
            conversation: None,
            summarize_titles: true,
            participants: ParticipantsInfo::default(),
            rng,
        }
    }

    pub fn from_config(
        cfg: &Config,
        store: DocumentStore,
        completer: Box<dyn Completer + Send>,
    ) -> Self {
        let mut svc = Self::new(store, &cfg.user.id, completer, StdRng::from_os_rng());
        svc.summarize_titles = cfg.chat.summarize_titles;
        svc.participants = ParticipantsInfo {
            bot: Participant {
                display_name: Some("i9 Delivery".to_string()),
                avatar_url: None,
            },
            user: Participant {
                display_name: Some(cfg.user.display_name.clone()),
                avatar_url: None,
            },
        };
        svc
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    /// Resume an existing conversation. The wizard always restarts idle.
    pub fn open_conversation(&mut self, id: &str) -> Result<&Conversation> {
        let conversation = conversations::load_conversation(&self.store, id)?
            .with_context(|| format!("conversation {id} not found"))?;
        if conversation.user_id != self.session.user_id {
            bail!("conversation {id} belongs to another user");
        }
        self.session = Session::new(self.session.user_id.clone());
        Ok(self.conversation.insert(conversation))
    }

    /// Drop the current conversation; the next message starts a new one.
    pub fn reset(&mut self) {
        self.conversation = None;
        self.session = Session::new(self.session.user_id.clone());
    }

    pub fn submit(&mut self, text: &str) -> Result<SubmitOutcome> {
        let text = text.trim();
        if text.is_empty() {
            bail!("empty message");
        }

        if self.conversation.is_none() {
            let id = uuid::Uuid::new_v4().to_string();
            let conversation = Conversation::new(id, self.session.user_id.clone(), DEFAULT_TITLE)
                .with_participants(self.participants.clone());
            conversations::save_conversation(&self.store, &conversation)?;
            info!(conversation = %conversation.id, "conversation created");
            self.conversation = Some(conversation);
        }
        let Some(conversation) = self.conversation.as_mut() else {
            bail!("no active conversation");
        };

        let first_message = conversation.is_fresh();
        let user_message = UiMessage::user(text);
        conversations::append_message(&self.store, &conversation.id, &user_message)?;
        conversation.messages.push(user_message.clone());

        // An operator may have toggled the flag from another process.
        if let Some(stored) = conversations::load_conversation(&self.store, &conversation.id)? {
            conversation.is_bot_paused = stored.is_bot_paused;
            conversation.title = stored.title;
        }

        if conversation.is_bot_paused {
            info!(conversation = %conversation.id, "bot paused, turn stored without reply");
            return Ok(SubmitOutcome {
                conversation_id: conversation.id.clone(),
                user_message,
                reply: None,
                route: None,
                created: None,
                first_message,
            });
        }

        let outcome = handle_turn(
            &mut self.session,
            text,
            self.completer.as_ref(),
            &mut self.backoffice,
            &mut self.rng,
        );

        let kind = match outcome.route {
            TurnRoute::Wizard | TurnRoute::InsertDelivery => MessageKind::DeliveryForm,
            _ => MessageKind::Text,
        };
        let reply = UiMessage::assistant(outcome.reply).with_kind(kind);
        // The turn has already taken effect; a delivery may have been stored.
        if let Err(e) = conversations::append_message(&self.store, &conversation.id, &reply) {
            error!(conversation = %conversation.id, error = %e, "could not store bot reply");
        }
        conversation.messages.push(reply.clone());

        Ok(SubmitOutcome {
            conversation_id: conversation.id.clone(),
            user_message,
            reply: Some(reply),
            route: Some(outcome.route),
            created: outcome.created,
            first_message,
        })
    }

    /// Re-label the current conversation from its first user message.
    /// Returns the new title when it changed.
    pub fn refresh_title(&mut self) -> Result<Option<String>> {
        if !self.summarize_titles {
            return Ok(None);
        }
        let Some(conversation) = self.conversation.as_mut() else {
            return Ok(None);
        };
        if conversation.title != DEFAULT_TITLE {
            return Ok(None);
        }
        let Some(first) = conversation
            .messages
            .iter()
            .find(|m| m.role == i9chat_core::Role::User)
        else {
            return Ok(None);
        };

        let title = summarize_title(self.completer.as_ref(), &first.content);
        if title == DEFAULT_TITLE {
            warn!(conversation = %conversation.id, "title summary unavailable");
            return Ok(None);
        }
        conversations::set_title(&self.store, &conversation.id, &title)?;
        conversation.title = title.clone();
        Ok(Some(title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use i9chat_core::{Address, CompletionRequest, Role, UserRecord};
    use i9chat_store::directory::{self, DirectoryData};
    use std::sync::Mutex;

    struct Scripted(Mutex<Vec<String>>);

    impl Scripted {
        fn new(replies: &[&str]) -> Box<Self> {
            Box::new(Self(Mutex::new(
                replies.iter().rev().map(|s| s.to_string()).collect(),
            )))
        }
    }

    impl Completer for Scripted {
        fn complete(&self, _request: &CompletionRequest) -> i9chat_core::Result<String> {
            self.0
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| i9chat_core::Error::Completion("script exhausted".to_string()))
        }
    }

    fn seeded_store() -> (tempfile::TempDir, DocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        let data = DirectoryData {
            couriers: vec![],
            users: vec![UserRecord {
                id: "u1".to_string(),
                name: "Maria Souza".to_string(),
                address: Some(Address::new(
                    "Rua das Flores",
                    "10",
                    "Centro",
                    "Itu",
                    "SP",
                    "13300-000",
                )),
            }],
            catalog: vec![],
        };
        directory::install(&store, &data).unwrap();
        (dir, store)
    }

    #[test]
    fn test_first_message_creates_conversation_and_persists_both_messages() {
        let (_dir, store) = seeded_store();
        let completer = Scripted::new(&[
            r#"{"event":{"code":"general_response","correlation":null},"message":"Olá! Como posso ajudar?"}"#,
        ]);
        let mut svc = ChatService::new(store.clone(), "demo", completer, StdRng::seed_from_u64(1));

        let out = svc.submit("  oi  ").unwrap();
        assert!(out.first_message);
        assert_eq!(out.user_message.content, "oi");
        assert_eq!(out.reply.as_ref().unwrap().content, "Olá! Como posso ajudar?");
        assert_eq!(out.route, Some(TurnRoute::Relay));

        let stored = conversations::load_conversation(&store, &out.conversation_id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.title, DEFAULT_TITLE);
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.messages[0].role, Role::User);
        assert_eq!(stored.messages[1].role, Role::Assistant);
    }

    /// Replaces the messages sub-collection with a plain file while the
    /// turn is being answered, so the reply write fails.
    struct BreaksTranscript {
        root: std::path::PathBuf,
    }

    impl Completer for BreaksTranscript {
        fn complete(&self, _request: &CompletionRequest) -> i9chat_core::Result<String> {
            let conversations = self.root.join("conversations");
            for entry in std::fs::read_dir(&conversations).unwrap() {
                let dir = entry.unwrap().path();
                if dir.is_dir() {
                    let messages = dir.join("messages");
                    std::fs::remove_dir_all(&messages).unwrap();
                    std::fs::write(&messages, b"not a directory").unwrap();
                }
            }
            Ok(r#"{"event":{"code":"general_response","correlation":null},"message":"Tudo certo."}"#.to_string())
        }
    }

    #[test]
    fn test_reply_write_failure_still_returns_the_turn() {
        let (dir, store) = seeded_store();
        let completer = Box::new(BreaksTranscript {
            root: dir.path().to_path_buf(),
        });
        let mut svc = ChatService::new(store.clone(), "demo", completer, StdRng::seed_from_u64(1));

        let out = svc.submit("oi").unwrap();
        assert_eq!(out.reply.as_ref().unwrap().content, "Tudo certo.");
        assert_eq!(out.route, Some(TurnRoute::Relay));
        assert_eq!(svc.conversation().unwrap().messages.len(), 2);
        assert!(conversations::load_messages(&store, &out.conversation_id).is_err());
    }

    #[test]
    fn test_empty_message_is_rejected() {
        let (_dir, store) = seeded_store();
        let mut svc = ChatService::new(store, "demo", Scripted::new(&[]), StdRng::seed_from_u64(1));
        assert!(svc.submit("   ").is_err());
        assert!(svc.conversation().is_none());
    }

    #[test]
    fn test_paused_conversation_stores_turn_without_reply() {
        let (_dir, store) = seeded_store();
        let completer = Scripted::new(&["primeira resposta"]);
        let mut svc = ChatService::new(store.clone(), "demo", completer, StdRng::seed_from_u64(1));

        let first = svc.submit("oi").unwrap();
        conversations::set_bot_paused(&store, &first.conversation_id, true).unwrap();

        // The script is exhausted; a model call would turn into the apology.
        let second = svc.submit("tem alguém aí?").unwrap();
        assert!(second.reply.is_none());
        assert!(!second.first_message);

        let messages = conversations::load_messages(&store, &first.conversation_id).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].content, "tem alguém aí?");
    }

    #[test]
    fn test_wizard_replies_are_delivery_forms() {
        let (_dir, store) = seeded_store();
        let completer = Scripted::new(&[
            r#"{"event":{"code":"insert_delivery","correlation":null},"message":"Vamos cadastrar."}"#,
        ]);
        let mut svc = ChatService::new(store.clone(), "demo", completer, StdRng::seed_from_u64(7));

        let ask = svc.submit("quero cadastrar uma entrega").unwrap();
        assert_eq!(ask.reply.unwrap().kind, Some(MessageKind::DeliveryForm));

        svc.submit("Av. Brasil, 200 - Jardim, Itu - SP, 13301-100").unwrap();
        let done = svc.submit("maria souza").unwrap();
        assert_eq!(done.route, Some(TurnRoute::Wizard));
        let created = done.created.unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.origin().city, "Itu");
        assert_eq!(created.destination().street, "Av. Brasil");

        let saved = i9chat_store::deliveries::load_deliveries(&store, "demo").unwrap();
        assert_eq!(saved, vec![created]);
    }

    #[test]
    fn test_refresh_title_summarizes_first_message_once() {
        let (_dir, store) = seeded_store();
        let completer = Scripted::new(&["Resposta qualquer", "\"Status da entrega 7\"\n"]);
        let mut svc = ChatService::new(store.clone(), "demo", completer, StdRng::seed_from_u64(1));

        let out = svc.submit("cadê minha entrega 7?").unwrap();
        let title = svc.refresh_title().unwrap();
        assert_eq!(title.as_deref(), Some("Status da entrega 7"));
        assert_eq!(svc.refresh_title().unwrap(), None);

        let stored = conversations::load_conversation(&store, &out.conversation_id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.title, "Status da entrega 7");
    }

    #[test]
    fn test_refresh_title_disabled() {
        let (_dir, store) = seeded_store();
        let mut svc = ChatService::new(store, "demo", Scripted::new(&["oi"]), StdRng::seed_from_u64(1));
        svc.summarize_titles = false;
        svc.submit("olá").unwrap();
        assert_eq!(svc.refresh_title().unwrap(), None);
    }

    #[test]
    fn test_open_conversation_rejects_other_users() {
        let (_dir, store) = seeded_store();
        let other = Conversation::new("c-1", "someone-else", DEFAULT_TITLE);
        conversations::save_conversation(&store, &other).unwrap();

        let mut svc = ChatService::new(store, "demo", Scripted::new(&[]), StdRng::seed_from_u64(1));
        assert!(svc.open_conversation("c-1").is_err());
        assert!(svc.open_conversation("missing").is_err());
    }
}
