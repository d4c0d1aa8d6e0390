//! Common test utilities and fixtures.

pub mod postgres;

#[allow(unused_imports)]
pub use postgres::*;
