//! Models for the `destinations` table.

use sqlx::FromRow;
use wayfarer_core::duplicate_detection::ExistingDestination;
use wayfarer_core::types::DbId;

/// The columns duplicate detection needs.
#[derive(Debug, Clone, FromRow)]
pub struct DestinationIdentity {
    pub id: DbId,
    pub name_en: String,
    pub name_th: String,
    pub lat: f64,
    pub lng: f64,
}

impl From<DestinationIdentity> for ExistingDestination {
    fn from(row: DestinationIdentity) -> Self {
        Self {
            id: row.id,
            name_en: row.name_en,
            name_th: row.name_th,
            lat: row.lat,
            lng: row.lng,
        }
    }
}
