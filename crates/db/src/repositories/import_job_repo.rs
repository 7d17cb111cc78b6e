//! Repository for the `import_jobs` table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::import_job::{ImportJob, UpsertImportJob};

const COLUMNS: &str = "import_id, status, file_hash, total_rows, written_rows, skipped_rows, \
    error, expires_at, created_at, updated_at";

/// Provides data-access methods for import status tracking.
pub struct ImportJobRepo;

impl ImportJobRepo {
    /// Insert a job, or replace the mutable columns of an existing one.
    pub async fn upsert(pool: &PgPool, input: &UpsertImportJob) -> Result<ImportJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO import_jobs \
                (import_id, status, file_hash, total_rows, written_rows, skipped_rows, \
                 error, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (import_id) \
             DO UPDATE SET \
                status = EXCLUDED.status, \
                total_rows = EXCLUDED.total_rows, \
                written_rows = EXCLUDED.written_rows, \
                skipped_rows = EXCLUDED.skipped_rows, \
                error = EXCLUDED.error, \
                expires_at = EXCLUDED.expires_at, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(input.import_id)
            .bind(input.status)
            .bind(&input.file_hash)
            .bind(input.total_rows)
            .bind(input.written_rows)
            .bind(input.skipped_rows)
            .bind(&input.error)
            .bind(input.expires_at)
            .bind(input.created_at)
            .fetch_one(pool)
            .await
    }

    /// Find an unexpired job.
    pub async fn find_live(pool: &PgPool, import_id: Uuid) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM import_jobs WHERE import_id = $1 AND expires_at > NOW()"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(import_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a job. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, import_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM import_jobs WHERE import_id = $1")
            .bind(import_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove expired jobs, returning how many were deleted.
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM import_jobs WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
