//! API module for the NetPrep HTTP server

pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig};
