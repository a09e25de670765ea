//! Per-user delivery lists, stored as one document per user.

use i9chat_core::Delivery;
use serde::{Deserialize, Serialize};

use crate::document::DocumentStore;
use crate::error::Result;

pub const COLLECTION: &str = "deliveries";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DeliveryList {
    #[serde(default)]
    deliveries: Vec<Delivery>,
}

pub fn load_deliveries(store: &DocumentStore, user_id: &str) -> Result<Vec<Delivery>> {
    Ok(store
        .get::<DeliveryList>(COLLECTION, user_id)?
        .unwrap_or_default()
        .deliveries)
}

pub fn save_deliveries(store: &DocumentStore, user_id: &str, deliveries: &[Delivery]) -> Result<()> {
    let doc = DeliveryList {
        deliveries: deliveries.to_vec(),
    };
    store.set(COLLECTION, user_id, &doc)
}

/// Read-modify-write of the user's whole list.
pub fn append_delivery(store: &DocumentStore, user_id: &str, delivery: Delivery) -> Result<()> {
    let mut all = load_deliveries(store, user_id)?;
    all.push(delivery);
    save_deliveries(store, user_id, &all)
}
