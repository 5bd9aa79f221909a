//! Database module
//!
//! Exposes the `Db` struct and its methods to interact with the catalog database
//! through pre-defined queries, plus the record types those queries return.
pub mod queries;
pub mod types;

pub use queries::Db;
