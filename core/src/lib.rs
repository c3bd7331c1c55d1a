//! Reconcile per-metric health export CSVs into daily tables, load them into
//! SQLite, and aggregate trends over the result.

pub mod aggregate;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod loader;
pub mod mapping;
pub mod models;
pub mod pipeline;
pub mod reconcile;
pub mod reports;
pub mod service;
pub mod source;
pub mod store;
pub mod transformed;

pub use error::{Error, Result};
