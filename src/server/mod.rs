pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod routes;
#[allow(clippy::module_inception)]
pub mod server;
pub mod websocket;

pub use server::{create_router, AppState, RegistryServer};
