//! Postgres-backed relational storage for the entities of spec.md §3.
//!
//! Grounded on `chronx-state::db`'s one-struct-with-a-method-per-entity
//! shape; `StorageDb` replaces the embedded sled tree with a pooled
//! `PgPool` because the credit ledger and session-tracking invariants
//! need row-level locks and multi-table transactions sled cannot give us.

pub mod db;
pub mod models;
pub mod queries;

pub use db::StorageDb;
