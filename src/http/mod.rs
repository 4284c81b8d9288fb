//! HTTP surface: batch import endpoints and webhook receivers.

pub mod server;

pub use server::{router, serve_http, serve_on, AppState};
