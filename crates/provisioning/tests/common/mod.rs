//! Common test utilities and fixtures.

pub mod fakes;
pub mod memory;

#[allow(unused_imports)]
pub use fakes::*;
#[allow(unused_imports)]
pub use memory::*;
#[allow(unused_imports)]
pub use postgres::*;
