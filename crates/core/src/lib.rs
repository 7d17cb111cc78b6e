//! Wayfarer core: pure domain logic for bulk destination imports.
//!
//! Nothing in this crate performs I/O. The tokenizer, schema evaluator,
//! business rules, duplicate index, and result aggregation are plain
//! functions; network and storage access sit behind the traits in
//! [`collaborators`].

pub mod collaborators;
pub mod destination;
pub mod duplicate_detection;
pub mod error;
pub mod hashing;
pub mod import_status;
pub mod options;
pub mod tokenizer;
pub mod types;
pub mod validation;
