//! i9chat-core: domain model and conversation routing for the i9 Delivery support chat.
//!
//! Nothing in here talks to the network or the disk. The completion API and the
//! document store are reached through the [`Completer`] and [`Backoffice`] traits,
//! which the store and CLI crates implement.

pub mod address;
pub mod delivery;
pub mod error;
pub mod interpret;
pub mod message;
pub mod prompt;
pub mod replies;
pub mod router;
pub mod title;
pub mod wizard;

pub use address::{parse_address, Address};
pub use delivery::{Courier, Delivery, UserRecord};
pub use error::{Error, Result};
pub use interpret::{interpret, Event, EventCode, Interpretation, StructuredReply};
pub use message::{Conversation, MessageKind, Participant, ParticipantsInfo, Role, UiMessage};
pub use prompt::{build_request, response_schema, system_instruction, CompletionRequest};
pub use router::{handle_turn, Backoffice, Completer, Session, TurnOutcome, TurnRoute};
pub use title::{clean_title, summarize_title, DEFAULT_TITLE};
pub use wizard::{WizardState, WizardStep};
