//! Versioned object storage for daily quote data.
//!
//! - [`keys`]: pure encode/decode/convert of object keys across layout versions.
//! - [`blob`]: the [`BlobStore`](blob::BlobStore) abstraction with in-memory and
//!   filesystem backends.
//! - [`atomic`]: temp-write / copy-publish updates of single objects.
//! - [`migrate`]: batch rewrite of keys from older layouts.

#![deny(missing_docs)]

pub mod atomic;
pub mod blob;
pub mod error;
pub mod keys;
pub mod migrate;
