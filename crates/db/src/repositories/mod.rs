//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept a pool or an open transaction as the first argument.

pub mod destination_repo;
pub mod import_job_repo;

pub use destination_repo::DestinationRepo;
pub use import_job_repo::ImportJobRepo;
