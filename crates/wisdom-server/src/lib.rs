//! Wisdom Server
//!
//! The HTTP front of the Wisdom search engine.
//!
//! # Features
//!
//! - Catalog, column type and permutation endpoints
//! - Phase 1 table search across one or several databases
//! - Phase 2 paginated row retrieval
//! - Environment-driven configuration with CORS for the frontends

pub mod config;
pub mod http_server;
pub mod server;

pub use config::ServerConfig;
pub use http_server::{create_router, AppState};
pub use server::Server;
