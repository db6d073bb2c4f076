//! Fetch executor: retrieves the raw bytes of every declared document.
//!
//! This crate provides [`Fetcher`], a concurrent, bounded HTTP fetcher that
//! honors each source's `response_type` so binary files are never decoded.

pub mod engine;

pub use engine::Fetcher;
