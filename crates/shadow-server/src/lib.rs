//! HTTP API for the shadow document store.
//!
//! Exposes the entry operations under `/api/v1` with query-string
//! parameters and `{"code", "message"}` status bodies. Blocking store work
//! runs on tokio's blocking pool.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use handler::ApiResponse;
pub use router::build_router;
pub use server::{shutdown_signal, ShadowServer};
pub use state::AppState;
