//! Delivery heatmap points.

use serde::{Deserialize, Serialize};

use crate::document::DocumentStore;
use crate::error::Result;

pub const COLLECTION: &str = "heatmap";
const DOC_ID: &str = "points";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Demo points around Itu/Salto - SP.
pub fn default_points() -> Vec<HeatPoint> {
    vec![
        HeatPoint { lat: -23.2645, lng: -47.2992 },
        HeatPoint { lat: -23.2630, lng: -47.2960 },
        HeatPoint { lat: -23.2960, lng: -47.2840 },
        HeatPoint { lat: -23.2900, lng: -47.2900 },
    ]
}

#[derive(Serialize, Deserialize)]
struct Points {
    points: Vec<HeatPoint>,
}

/// Stored points, or the demo set when none were saved.
pub fn points(store: &DocumentStore) -> Result<Vec<HeatPoint>> {
    Ok(store
        .get::<Points>(COLLECTION, DOC_ID)?
        .map(|p| p.points)
        .unwrap_or_else(default_points))
}

pub fn save_points(store: &DocumentStore, points: &[HeatPoint]) -> Result<()> {
    store.set(
        COLLECTION,
        DOC_ID,
        &Points {
            points: points.to_vec(),
        },
    )
}
