//! Identifier normalization and client identity resolution.

pub mod normalize;
pub mod resolver;

pub use resolver::{IdentityCandidates, IdentityResolver};
