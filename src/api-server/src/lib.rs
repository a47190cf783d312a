// Management API server for the Fleetgate authorization engine

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;
pub mod stores;

pub use error::{ApiError, Result};
pub use server::Server;
pub use state::AppState;

/// API version prefix
pub const API_VERSION: &str = "v1";
