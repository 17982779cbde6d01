//! This module handles in-memory document storage.

pub mod memtable;
pub mod record;
