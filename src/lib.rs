//! enrollq library
//!
//! Keeps a cached snapshot of every department's admission table on the
//! enrollment board and answers where an exam number stands in each of them.

pub mod cache;
pub mod cli;
pub mod data;
pub mod engine;
pub mod fetch;
pub mod report;
