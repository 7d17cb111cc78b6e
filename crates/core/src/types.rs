/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Globally unique identifier issued to every committed import.
pub type ImportId = uuid::Uuid;

/// Issue a fresh, time-ordered import identifier.
pub fn new_import_id() -> ImportId {
    uuid::Uuid::now_v7()
}
