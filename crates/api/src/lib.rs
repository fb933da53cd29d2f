//! HTTP API for the goodshelf book-review service.
//!
//! The binary in `main.rs` wires a store backend into the domain services
//! and serves the router from [`handlers::router`]. Sessions are cookie
//! tokens held in memory.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod sessions;
pub mod state;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use handlers::router;
pub use sessions::{SESSION_COOKIE, SessionStore};
pub use state::AppState;
