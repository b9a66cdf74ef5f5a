//! Principal Aggregate
//!
//! Identity records and their storage backends.

pub mod entity;
pub mod repository;
pub mod postgres;
pub mod api;

// Re-export main types
pub use entity::{Principal, PrincipalStatus, Role};
pub use repository::{InMemoryPrincipalStore, PrincipalLoader, PrincipalStore};
pub use postgres::PgPrincipalRepository;
pub use api::{admin_router, organizations_router};
