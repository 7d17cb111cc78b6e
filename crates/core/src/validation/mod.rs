//! Row validation engine.
//!
//! Provides issue types, the table-driven schema evaluator, business rules,
//! row previews with result aggregation, and commit planning — all without
//! network or database dependencies.

pub mod business;
pub mod conflict;
pub mod evaluator;
pub mod import_preview;
pub mod rules;
