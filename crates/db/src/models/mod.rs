//! Row types for the import tables.

pub mod destination;
pub mod import_job;
