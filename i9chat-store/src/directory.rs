//! Directory documents: couriers, customers and the pre-existing delivery
//! catalog.

use i9chat_core::{Courier, Delivery, UserRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::DocumentStore;
use crate::error::Result;

pub const COLLECTION: &str = "directory";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryData {
    #[serde(default)]
    pub couriers: Vec<Courier>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub catalog: Vec<Delivery>,
}

#[derive(Serialize, Deserialize)]
struct Items<T> {
    items: Vec<T>,
}

fn load_items<T>(store: &DocumentStore, id: &str) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    Ok(store
        .get::<Items<T>>(COLLECTION, id)?
        .map(|d| d.items)
        .unwrap_or_default())
}

fn save_items<T: Serialize + Clone>(store: &DocumentStore, id: &str, items: &[T]) -> Result<()> {
    store.set(
        COLLECTION,
        id,
        &Items {
            items: items.to_vec(),
        },
    )
}

pub fn couriers(store: &DocumentStore) -> Result<Vec<Courier>> {
    load_items(store, "couriers")
}

pub fn users(store: &DocumentStore) -> Result<Vec<UserRecord>> {
    load_items(store, "users")
}

pub fn catalog(store: &DocumentStore) -> Result<Vec<Delivery>> {
    load_items(store, "catalog")
}

/// Replace all three directory documents.
pub fn install(store: &DocumentStore, data: &DirectoryData) -> Result<()> {
    save_items(store, "couriers", &data.couriers)?;
    save_items(store, "users", &data.users)?;
    save_items(store, "catalog", &data.catalog)?;
    info!(
        couriers = data.couriers.len(),
        users = data.users.len(),
        catalog = data.catalog.len(),
        "directory installed"
    );
    Ok(())
}

pub fn load(store: &DocumentStore) -> Result<DirectoryData> {
    Ok(DirectoryData {
        couriers: couriers(store)?,
        users: users(store)?,
        catalog: catalog(store)?,
    })
}
