//! Delivery-insertion wizard.
//!
//! A linear, multi-turn form: destination address, then responsible party,
//! then (only when the responsible party has no address on file) the origin
//! address. There is no cancel or back transition; a malformed address keeps
//! the wizard on the same step until a matching line arrives.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::address::{parse_address, Address};
use crate::delivery::{Delivery, UserRecord, NEW_DELIVERY_SITUATION};
use crate::replies;
use crate::router::Backoffice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardStep {
    #[serde(rename = "destino")]
    Destination,
    #[serde(rename = "responsavel")]
    Responsible,
    #[serde(rename = "origem")]
    Origin,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WizardState {
    #[default]
    Idle,
    AwaitingDestination,
    AwaitingResponsible {
        destination: Address,
    },
    AwaitingOrigin {
        destination: Address,
        responsible: UserRecord,
    },
}

impl WizardState {
    pub fn step(&self) -> Option<WizardStep> {
        match self {
            WizardState::Idle => None,
            WizardState::AwaitingDestination => Some(WizardStep::Destination),
            WizardState::AwaitingResponsible { .. } => Some(WizardStep::Responsible),
            WizardState::AwaitingOrigin { .. } => Some(WizardStep::Origin),
        }
    }

    pub fn is_active(&self) -> bool {
        self.step().is_some()
    }

    /// Destination collected so far, if any.
    pub fn pending_destination(&self) -> Option<&Address> {
        match self {
            WizardState::AwaitingResponsible { destination }
            | WizardState::AwaitingOrigin { destination, .. } => Some(destination),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WizardReply {
    pub reply: String,
    pub created: Option<Delivery>,
}

impl WizardReply {
    fn say(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            created: None,
        }
    }
}

/// Feed one user message to an active wizard.
///
/// Returns `None` when the wizard is idle, in which case the message belongs
/// to the model.
pub fn advance<B, R>(
    state: &mut WizardState,
    input: &str,
    backoffice: &mut B,
    rng: &mut R,
) -> Option<WizardReply>
where
    B: Backoffice + ?Sized,
    R: Rng + ?Sized,
{
    let reply = match std::mem::take(state) {
        WizardState::Idle => return None,

        WizardState::AwaitingDestination => match parse_address(input) {
            Some(destination) => {
                info!(city = %destination.city, "wizard: destination accepted");
                *state = WizardState::AwaitingResponsible { destination };
                WizardReply::say(replies::ASK_RESPONSIBLE)
            }
            None => {
                info!("wizard: destination rejected");
                *state = WizardState::AwaitingDestination;
                WizardReply::say(replies::INVALID_ADDRESS)
            }
        },

        WizardState::AwaitingResponsible { destination } => match backoffice.find_user(input) {
            Ok(Some(user)) => match user.address.clone() {
                Some(origin) => {
                    let retry = WizardState::AwaitingResponsible {
                        destination: destination.clone(),
                    };
                    finish(state, origin, destination, backoffice, rng, retry)
                }
                None => {
                    info!(user = %user.id, "wizard: responsible has no address on file");
                    *state = WizardState::AwaitingOrigin {
                        destination,
                        responsible: user,
                    };
                    WizardReply::say(replies::ASK_ORIGIN)
                }
            },
            Ok(None) => {
                info!("wizard: responsible not found");
                *state = WizardState::AwaitingResponsible { destination };
                WizardReply::say(replies::RESPONSIBLE_NOT_FOUND)
            }
            Err(e) => {
                error!(error = %e, "wizard: user lookup failed");
                *state = WizardState::AwaitingResponsible { destination };
                WizardReply::say(replies::APOLOGY)
            }
        },

        WizardState::AwaitingOrigin {
            destination,
            responsible,
        } => match parse_address(input) {
            Some(origin) => {
                let retry = WizardState::AwaitingOrigin {
                    destination: destination.clone(),
                    responsible,
                };
                finish(state, origin, destination, backoffice, rng, retry)
            }
            None => {
                *state = WizardState::AwaitingOrigin {
                    destination,
                    responsible,
                };
                WizardReply::say(replies::INVALID_ADDRESS)
            }
        },
    };

    Some(reply)
}

/// Build and persist the record. On a storage failure the wizard goes back to
/// `retry_state` so the same answer can be sent again.
fn finish<B, R>(
    state: &mut WizardState,
    origin: Address,
    destination: Address,
    backoffice: &mut B,
    rng: &mut R,
    retry_state: WizardState,
) -> WizardReply
where
    B: Backoffice + ?Sized,
    R: Rng + ?Sized,
{
    let id = backoffice.next_delivery_id();
    let pool = backoffice.sample_pool();
    let (id, pool) = match (id, pool) {
        (Ok(id), Ok(pool)) => (id, pool),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "wizard: could not build delivery");
            *state = retry_state;
            return WizardReply::say(replies::APOLOGY);
        }
    };

    let delivery = synthesize_delivery(id, origin, destination, &pool, rng);

    if let Err(e) = backoffice.append_delivery(delivery.clone()) {
        error!(error = %e, "wizard: could not persist delivery");
        *state = retry_state;
        return WizardReply::say(replies::APOLOGY);
    }

    info!(id = delivery.id, courier = %delivery.deliveryman, "wizard: delivery created");
    *state = WizardState::Idle;
    WizardReply {
        reply: replies::delivery_created(&delivery.summary()),
        created: Some(delivery),
    }
}

/// Assemble a new delivery.
///
/// Courier and price are copied from a uniformly sampled existing delivery;
/// with an empty pool the courier is left unassigned at price zero.
pub fn synthesize_delivery<R: Rng + ?Sized>(
    id: u64,
    origin: Address,
    destination: Address,
    pool: &[Delivery],
    rng: &mut R,
) -> Delivery {
    let sample = pool.choose(rng);

    let deliveryman = sample
        .map(|d| d.deliveryman.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(replies::UNASSIGNED_COURIER)
        .to_string();

    Delivery {
        id,
        addresses: [origin, destination],
        deliveryman,
        price: sample.map(|d| d.price).unwrap_or(0.0),
        situation: NEW_DELIVERY_SITUATION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn addr(street: &str) -> Address {
        Address::new(street, "1", "Centro", "Itu", "SP", "13300-000")
    }

    fn pooled(id: u64, courier: &str, price: f64) -> Delivery {
        Delivery {
            id,
            addresses: [addr("Rua A"), addr("Rua B")],
            deliveryman: courier.to_string(),
            price,
            situation: "Entregue".to_string(),
        }
    }

    #[test]
    fn test_synthesize_copies_courier_and_price_from_pool() {
        let pool = vec![pooled(1, "Ana", 12.0), pooled(2, "Beto", 30.0)];
        let mut rng = StdRng::seed_from_u64(7);
        let d = synthesize_delivery(3, addr("Origem"), addr("Destino"), &pool, &mut rng);

        assert_eq!(d.id, 3);
        assert_eq!(d.origin().street, "Origem");
        assert_eq!(d.destination().street, "Destino");
        assert!(pool.iter().any(|p| p.deliveryman == d.deliveryman && p.price == d.price));
        assert_eq!(d.situation, NEW_DELIVERY_SITUATION);
    }

    #[test]
    fn test_synthesize_with_empty_pool_keeps_fields_non_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        let d = synthesize_delivery(1, addr("O"), addr("D"), &[], &mut rng);
        assert_eq!(d.deliveryman, replies::UNASSIGNED_COURIER);
        assert_eq!(d.price, 0.0);
    }

    #[test]
    fn test_step_and_pending_destination() {
        assert_eq!(WizardState::Idle.step(), None);
        assert_eq!(
            WizardState::AwaitingDestination.step(),
            Some(WizardStep::Destination)
        );
        let s = WizardState::AwaitingResponsible {
            destination: addr("Rua X"),
        };
        assert_eq!(s.step(), Some(WizardStep::Responsible));
        assert_eq!(s.pending_destination().map(|a| a.street.as_str()), Some("Rua X"));
        assert_eq!(
            serde_json::to_value(WizardStep::Responsible).unwrap(),
            "responsavel"
        );
    }
}
