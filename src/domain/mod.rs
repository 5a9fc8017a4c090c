//! Domain layer - Pure business abstractions
//!
//! This layer contains no storage or transport logic. Only trait definitions,
//! peer types and domain error types (plus `From` conversions for the errors
//! raised by SeaORM and reqwest).

pub mod errors;
pub mod repositories;

pub use errors::DomainError;
pub use repositories::*;
