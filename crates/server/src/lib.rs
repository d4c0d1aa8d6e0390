//! HTTP surface for Tenement.
//!
//! - Host-based tenant routing middleware
//! - Public signup and tenant listing
//! - Admin tenant management behind a bearer token
//! - Health and Prometheus endpoints

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod tenant;
pub mod validation;

pub use auth::TraceId;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
