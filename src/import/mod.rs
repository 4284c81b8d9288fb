//! Batch import: parse an uploaded table, map its columns, and run each
//! row through identity resolution and the conflict policy.

pub mod mapping;
pub mod parse;
pub mod pipeline;
pub mod template;

pub use mapping::{ColumnMapping, TargetField, Transform};
pub use parse::{ParsedTable, TablePreview};
pub use pipeline::ImportPipeline;
