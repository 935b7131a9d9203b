//! Daily quote ingestion: fetch from a quote provider, validate, and store
//! atomically under the current key layout.

pub mod config;
pub mod io;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod providers;
pub mod quality;
