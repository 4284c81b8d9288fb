//! Domain model module declarations.

pub mod activity;
pub mod advisor;
pub mod appointment;
pub mod client;
pub mod event;
pub mod import_job;
pub mod notification;
pub mod task;
