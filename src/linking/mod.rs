//! Phase linking - turns declarations into concrete models
//!
//! A phase declares each parameter as a fixed value, a prior, a reference
//! to an earlier phase's estimate, or an alignment with another parameter.
//! Resolution substitutes the referenced estimates; validation checks the
//! whole chain before anything is fitted.

pub mod error;
pub mod model;
pub mod resolver;
pub mod validate;

pub use error::{LinkError, UnresolvedReferenceError};
pub use model::{ConcreteModel, ResolvedParameter};
pub use resolver::{resolve, Resolver};
pub use validate::validate_chain;
