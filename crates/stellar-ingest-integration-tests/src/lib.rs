//! Integration tests for the stellar-ingest workspace live in `tests/`.
//! This crate intentionally exports nothing.
