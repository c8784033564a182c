//! Bounded-staleness content distribution.
//!
//! A canonical content store is read by three independent surfaces: a
//! TTL-bounded aggregation cache, signal-driven page caches, and a batch
//! generator of derived platform artifacts. Every read path degrades to a
//! fallback instead of failing.

pub mod application;
pub mod artifacts;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
