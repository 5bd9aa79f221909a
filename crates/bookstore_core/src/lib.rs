//! `bookstore_core`
//!
//! Core library for the bookstore catalog and rating service. Users own books and
//! can like, bookmark and rate them; each per-user rating is folded into a
//! book-level aggregate score. The library holds the persistence layer, the
//! catalog query, the relation store and the access policy so that any thin
//! transport (currently the HTTP server crate) can sit on top without
//! duplicating logic.

pub mod catalog;

pub mod database;

pub mod policy;

pub mod rating;

pub mod relations;
