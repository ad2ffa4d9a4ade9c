//! Core types and trait definitions for the Taxon classification store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::TaxonomyStore`]; callers depend on the
//! trait and on the pure functions in [`rules`] and [`report`].

pub mod entity;
pub mod error;
pub mod level;
pub mod report;
pub mod rules;
pub mod store;

pub use error::{Classify, Error, ErrorKind, Result};
pub use level::Level;

/// Store-assigned row identifier.
pub type Id = i64;
