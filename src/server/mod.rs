//! The TCP server exposing a [crate::client::DocumentStore].

pub mod server;

pub use server::{dispatch, FlowerServer};
