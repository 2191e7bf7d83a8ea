//! Integration testing module
//!
//! Tests that drive the public API against an in-memory FFMS2:
//! - Library bootstrap and global state
//! - Indexing, progress and cancellation
//! - Index persistence and track lookup
//! - Video and audio sources, frame lifetimes
//! - Track data and timecode export
//! - Smoke test against the real shared library, when available

pub mod fixtures;
