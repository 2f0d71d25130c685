#![warn(clippy::unwrap_used)]

pub mod rest;
pub mod server;

pub use rest::{AppState, ProductRecommender};
pub use server::ApiServer;
