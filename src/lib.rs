pub mod client;
pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod logging;
pub mod networking;
pub mod query;
pub mod server;
pub mod storage;
pub mod walkthrough;

pub use client::Client;
pub use error::{Result, StoreError};
