//! Repository traits for registry operations.

pub mod databases;
pub mod plans;
pub mod tenants;

pub use databases::DatabaseAdmin;
pub use plans::PlanRepo;
pub use tenants::TenantRepo;
