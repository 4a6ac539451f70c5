//! # Persistent Storage
//!
//! Disk-backed implementations of [`crate::WoundStore`].

mod redb_store;

pub use redb_store::RedbStore;
