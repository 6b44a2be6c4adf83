//! lockaside: keyed caching with per-key locking, read-through loading,
//! and cache-aside adaptation of arbitrary method invocations.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod aside;
pub mod builder;
pub mod cache;
pub mod error;
mod executor;
pub mod loader;
pub mod lock;
pub mod prelude;
pub mod process;
pub mod stats;
pub mod store;
