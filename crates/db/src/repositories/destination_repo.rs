//! Repository for the `destinations` table.

use sqlx::PgPool;
use uuid::Uuid;
use wayfarer_core::destination::DestinationRecord;
use wayfarer_core::types::DbId;

use crate::models::destination::DestinationIdentity;

/// Provides data-access methods for destinations.
pub struct DestinationRepo;

impl DestinationRepo {
    /// Identity columns of every stored destination, for the duplicate index.
    pub async fn list_identities(pool: &PgPool) -> Result<Vec<DestinationIdentity>, sqlx::Error> {
        sqlx::query_as::<_, DestinationIdentity>(
            "SELECT id, name_en, name_th, lat, lng FROM destinations ORDER BY id",
        )
        .fetch_all(pool)
        .await
    }

    /// Insert a destination inside an open transaction, returning its id.
    pub async fn insert(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        import_id: Uuid,
        record: &DestinationRecord,
    ) -> Result<DbId, sqlx::Error> {
        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO destinations \
                (identity_key, name_th, name_en, description_th, description_en, category, \
                 budget_band, district, lat, lng, mood_tags, image_url, instagram_score, \
                 opening_hours, transport_access, is_active, import_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING id",
        )
        .bind(&record.identity_key)
        .bind(&record.name_th)
        .bind(&record.name_en)
        .bind(&record.description_th)
        .bind(&record.description_en)
        .bind(&record.category)
        .bind(&record.budget_band)
        .bind(&record.district)
        .bind(record.lat)
        .bind(record.lng)
        .bind(&record.mood_tags)
        .bind(&record.image_url)
        .bind(record.instagram_score)
        .bind(&record.opening_hours)
        .bind(&record.transport_access)
        .bind(record.is_active)
        .bind(import_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(id)
    }

    /// Replace every column of destination `id`. Returns `false` if no row
    /// with that id exists.
    pub async fn replace(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        import_id: Uuid,
        record: &DestinationRecord,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE destinations SET \
                identity_key = $2, name_th = $3, name_en = $4, description_th = $5, \
                description_en = $6, category = $7, budget_band = $8, district = $9, \
                lat = $10, lng = $11, mood_tags = $12, image_url = $13, instagram_score = $14, \
                opening_hours = $15, transport_access = $16, is_active = $17, import_id = $18, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&record.identity_key)
        .bind(&record.name_th)
        .bind(&record.name_en)
        .bind(&record.description_th)
        .bind(&record.description_en)
        .bind(&record.category)
        .bind(&record.budget_band)
        .bind(&record.district)
        .bind(record.lat)
        .bind(record.lng)
        .bind(&record.mood_tags)
        .bind(&record.image_url)
        .bind(record.instagram_score)
        .bind(&record.opening_hours)
        .bind(&record.transport_access)
        .bind(record.is_active)
        .bind(import_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
