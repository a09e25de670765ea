//! i9chat-store: JSON-file document store and the repositories built on it.
//!
//! Layout under the store root:
//!   conversations/<conversation_id>.json
//!   conversations/<conversation_id>/messages/<message_id>.json
//!   deliveries/<user_id>.json            { "deliveries": [...] }
//!   directory/{couriers,users,catalog}.json
//!   preferences/<user_id>.json           { "theme": "light" | "dark" }
//!   heatmap/points.json

pub mod backoffice;
pub mod conversations;
pub mod deliveries;
pub mod directory;
pub mod document;
pub mod error;
pub mod heatmap;
pub mod preferences;

pub use backoffice::StoreBackoffice;
pub use directory::DirectoryData;
pub use document::DocumentStore;
pub use error::{Result, StoreError};
pub use heatmap::HeatPoint;
pub use preferences::Theme;
