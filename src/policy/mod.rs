//! Decision policies applied between identity resolution and storage.

pub mod conflict;

pub use conflict::{ClientAction, ConflictPolicy, DuplicateStrategy};
