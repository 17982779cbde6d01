//! The in-memory document engine: databases, collections and their results.

pub mod collection;
pub mod database;
pub mod engine;
pub mod namespace;
pub mod results;

pub use collection::Collection;
pub use database::Database;
pub use engine::Engine;
pub use namespace::Namespace;
pub use results::*;
