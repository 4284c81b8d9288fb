#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod http;
pub mod identity;
pub mod import;
pub mod ingest;
pub mod models;
pub mod persistence;
pub mod policy;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
