//! HTTP request handlers.

pub mod common;
pub mod context;
pub mod health;
pub mod signup;
pub mod tenants;

pub use common::*;
pub use context::*;
pub use health::*;
pub use signup::*;
pub use tenants::*;
