use anyhow::{Context, Result};
use i9chat_store::{directory, heatmap, DirectoryData, DocumentStore};

const DEMO_DIRECTORY: &str = include_str!("../demo/directory.json");

pub fn demo_directory() -> Result<DirectoryData> {
    serde_json::from_str(DEMO_DIRECTORY).context("parse bundled demo directory")
}

/// Install the demo couriers, users, delivery catalog and heatmap points.
/// Leaves an existing directory alone unless `force` is set.
pub fn run_seed(store: &DocumentStore, force: bool) -> Result<bool> {
    let current = directory::load(store)?;
    let empty = current.couriers.is_empty() && current.users.is_empty() && current.catalog.is_empty();
    if !empty && !force {
        println!(
            "Directory already present under {} (use --force to overwrite).",
            store.root().display()
        );
        return Ok(false);
    }

    let data = demo_directory()?;
    directory::install(store, &data)?;
    heatmap::save_points(store, &heatmap::default_points())?;

    println!("Seeded {}:", store.root().display());
    println!("- {} couriers", data.couriers.len());
    println!("- {} users", data.users.len());
    println!("- {} catalog deliveries", data.catalog.len());
    println!("\nNext: i9chat chat");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use i9chat_core::Backoffice;
    use i9chat_store::StoreBackoffice;

    #[test]
    fn test_demo_directory_parses() {
        let d = demo_directory().unwrap();
        assert!(!d.couriers.is_empty());
        assert!(d.users.iter().any(|u| u.address.is_none()));
        assert!(d.users.iter().any(|u| u.address.is_some()));
    }

    #[test]
    fn test_seed_is_idempotent_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        assert!(run_seed(&store, false).unwrap());
        assert!(!run_seed(&store, false).unwrap());
        assert!(run_seed(&store, true).unwrap());

        let b = StoreBackoffice::new(store.clone(), "demo");
        assert_eq!(b.find_delivery(10).unwrap().unwrap().deliveryman, "Carlos Almeida");
        assert_eq!(b.next_delivery_id().unwrap(), 13);
        assert_eq!(heatmap::points(&store).unwrap().len(), 4);
    }
}
