//! [`Backoffice`] over the document store, scoped to one user.

use i9chat_core::{Backoffice, Courier, Delivery, UserRecord};

use crate::document::DocumentStore;
use crate::{deliveries, directory};

#[derive(Debug, Clone)]
pub struct StoreBackoffice {
    store: DocumentStore,
    user_id: String,
}

impl StoreBackoffice {
    pub fn new(store: DocumentStore, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Backoffice for StoreBackoffice {
    /// The user's own list first, then the catalog.
    fn find_delivery(&self, id: u64) -> i9chat_core::Result<Option<Delivery>> {
        let own = deliveries::load_deliveries(&self.store, &self.user_id)?;
        if let Some(d) = own.into_iter().find(|d| d.id == id) {
            return Ok(Some(d));
        }
        Ok(directory::catalog(&self.store)?
            .into_iter()
            .find(|d| d.id == id))
    }

    fn find_courier(&self, id: u64) -> i9chat_core::Result<Option<Courier>> {
        Ok(directory::couriers(&self.store)?
            .into_iter()
            .find(|c| c.id == id))
    }

    fn find_user(&self, name: &str) -> i9chat_core::Result<Option<UserRecord>> {
        Ok(directory::users(&self.store)?
            .into_iter()
            .find(|u| u.matches_name(name)))
    }

    fn sample_pool(&self) -> i9chat_core::Result<Vec<Delivery>> {
        Ok(directory::catalog(&self.store)?)
    }

    fn next_delivery_id(&self) -> i9chat_core::Result<u64> {
        let own = deliveries::load_deliveries(&self.store, &self.user_id)?;
        let catalog = directory::catalog(&self.store)?;
        let max = own.iter().chain(catalog.iter()).map(|d| d.id).max();
        Ok(max.map_or(1, |m| m + 1))
    }

    fn append_delivery(&mut self, delivery: Delivery) -> i9chat_core::Result<()> {
        Ok(deliveries::append_delivery(&self.store, &self.user_id, delivery)?)
    }
}
