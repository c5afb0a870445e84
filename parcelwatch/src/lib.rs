//! Watches a resident parcel portal and notifies when new parcels arrive.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod notification;
pub mod watcher;

pub use error::{Error, Result};
