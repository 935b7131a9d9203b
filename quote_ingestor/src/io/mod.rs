//! Storage formats written by the ingestion pipeline.

pub mod payload;
