//! Intent routing for one chat turn.
//!
//! Per turn:
//! 1) an active wizard consumes the message without calling the model
//! 2) otherwise the message is classified by the completion API
//! 3) the returned event code picks the handler
//!
//! Every failure ends in a chat reply; nothing here returns an error.

use rand::Rng;
use tracing::{error, info, warn};

use crate::delivery::{Courier, Delivery, UserRecord};
use crate::error::Result;
use crate::interpret::{interpret, EventCode, Interpretation, StructuredReply};
use crate::prompt::{build_request, CompletionRequest};
use crate::replies;
use crate::wizard::{self, WizardState};

/// Text-generation backend. Implementations return the whole completion,
/// streamed chunks already concatenated.
pub trait Completer {
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Lookups and writes the router needs from the document store.
pub trait Backoffice {
    fn find_delivery(&self, id: u64) -> Result<Option<Delivery>>;
    fn find_courier(&self, id: u64) -> Result<Option<Courier>>;
    /// Resolve a responsible party by display name.
    fn find_user(&self, name: &str) -> Result<Option<UserRecord>>;
    /// Existing deliveries new records borrow courier and price from.
    fn sample_pool(&self) -> Result<Vec<Delivery>>;
    fn next_delivery_id(&self) -> Result<u64>;
    fn append_delivery(&mut self, delivery: Delivery) -> Result<()>;
}

/// Per-conversation routing context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub wizard: WizardState,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            wizard: WizardState::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRoute {
    /// Consumed by the insertion wizard; the model was not called.
    Wizard,
    SearchDelivery,
    SearchDriver,
    InsertDelivery,
    /// Model words shown as they came (general response, unknown code,
    /// plain text, or a clarifying question).
    Relay,
    /// Completion or storage failure; the apology was shown.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub route: TurnRoute,
    pub created: Option<Delivery>,
}

impl TurnOutcome {
    fn new(route: TurnRoute, reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            route,
            created: None,
        }
    }
}

/// Handle one user message.
pub fn handle_turn<C, B, R>(
    session: &mut Session,
    text: &str,
    completer: &C,
    backoffice: &mut B,
    rng: &mut R,
) -> TurnOutcome
where
    C: Completer + ?Sized,
    B: Backoffice + ?Sized,
    R: Rng + ?Sized,
{
    if let Some(w) = wizard::advance(&mut session.wizard, text, backoffice, rng) {
        return TurnOutcome {
            reply: w.reply,
            route: TurnRoute::Wizard,
            created: w.created,
        };
    }

    let request = build_request(text);
    let raw = match completer.complete(&request) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "completion failed");
            return TurnOutcome::new(TurnRoute::Failed, replies::APOLOGY);
        }
    };

    match interpret(&raw) {
        Interpretation::PlainText(text) => TurnOutcome::new(TurnRoute::Relay, text),
        Interpretation::Structured(reply) => route_event(session, reply, backoffice),
    }
}

fn route_event<B: Backoffice + ?Sized>(
    session: &mut Session,
    reply: StructuredReply,
    backoffice: &B,
) -> TurnOutcome {
    info!(code = reply.event.code.as_str(), "routing event");

    match reply.event.code {
        EventCode::SearchDelivery => {
            let Some(id) = reply.event.correlation_id() else {
                return TurnOutcome::new(TurnRoute::Relay, reply.message);
            };
            lookup(
                TurnRoute::SearchDelivery,
                backoffice.find_delivery(id),
                Delivery::summary,
                replies::DELIVERY_NOT_FOUND,
            )
        }
        EventCode::SearchDriver => {
            let Some(id) = reply.event.correlation_id() else {
                return TurnOutcome::new(TurnRoute::Relay, reply.message);
            };
            lookup(
                TurnRoute::SearchDriver,
                backoffice.find_courier(id),
                Courier::summary,
                replies::DRIVER_NOT_FOUND,
            )
        }
        EventCode::InsertDelivery => {
            session.wizard = WizardState::AwaitingDestination;
            info!(user = %session.user_id, "wizard: started");
            TurnOutcome::new(TurnRoute::InsertDelivery, replies::ASK_DESTINATION)
        }
        EventCode::GeneralResponse | EventCode::Other(_) => {
            TurnOutcome::new(TurnRoute::Relay, reply.message)
        }
    }
}

fn lookup<T>(
    route: TurnRoute,
    found: Result<Option<T>>,
    render: impl FnOnce(&T) -> String,
    not_found: &str,
) -> TurnOutcome {
    match found {
        Ok(Some(v)) => TurnOutcome::new(route, render(&v)),
        Ok(None) => TurnOutcome::new(route, not_found),
        Err(e) => {
            error!(error = %e, "lookup failed");
            TurnOutcome::new(TurnRoute::Failed, replies::APOLOGY)
        }
    }
}
