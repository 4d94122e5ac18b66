//! Cache module for persisting the scraped snapshot to disk
//!
//! This module provides a snapshot store that keeps the last fetched tables
//! and their update time between runs. A missing or corrupt file degrades to
//! an empty snapshot instead of an error, so the first query simply refreshes.

mod manager;

pub use manager::{SnapshotStore, StoreError};
