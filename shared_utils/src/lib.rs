//! Small helpers shared by every crate in the workspace: environment access,
//! configuration errors and the injected [`event_log::EventLog`] capability.

pub mod config;
pub mod env;
pub mod event_log;
