//! Error types for the lockaside library.
//!
//! ## Key Components
//!
//! - [`CacheError`]: Returned by every [`Cache`](crate::cache::Cache)
//!   operation. Covers lifecycle misuse, store copy failures, loader
//!   failures and entry-processor failures.
//! - [`BoxError`]: The boxed error alias used at the loader and processor
//!   seams, where the failing code belongs to the caller.
//!
//! Store-level errors ([`StoreError`](crate::store::StoreError),
//! [`CopyError`](crate::store::CopyError)) live next to the store traits,
//! and cache-aside errors ([`AsideError`](crate::aside::AsideError),
//! [`BindingError`](crate::aside::BindingError)) next to the aside layer.

use thiserror::Error;

use crate::cache::CacheState;
use crate::store::StoreError;

/// Boxed error type carried across the loader and processor seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned by cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache is not in the `Started` state.
    #[error("cache `{name}` is {state}, operation requires a started cache")]
    NotStarted {
        /// Name of the cache the operation was attempted on.
        name: String,
        /// State the cache was observed in.
        state: CacheState,
    },

    /// A lifecycle transition was requested from the wrong state.
    #[error("cache `{name}` cannot transition from {from} to {to}")]
    Lifecycle {
        /// Name of the cache the transition was attempted on.
        name: String,
        /// State the cache was in.
        from: CacheState,
        /// State the transition targeted.
        to: CacheState,
    },

    /// The backing store failed, currently only on by-value copies.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The configured loader failed; no store mutation was performed.
    #[error("cache loader failed: {0}")]
    Loader(#[source] BoxError),

    /// An entry-processor closure failed; its commit was skipped.
    #[error("entry processor failed: {0}")]
    Processor(#[source] BoxError),

    /// An asynchronous load was cancelled, or its worker abandoned the
    /// job, before a result was produced.
    #[error("load request was cancelled before completion")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_started_display_names_cache_and_state() {
        let err = CacheError::NotStarted {
            name: "users".to_string(),
            state: CacheState::Stopped,
        };
        let text = err.to_string();
        assert!(text.contains("users"));
        assert!(text.contains("stopped"));
    }

    #[test]
    fn lifecycle_display_names_both_states() {
        let err = CacheError::Lifecycle {
            name: "users".to_string(),
            from: CacheState::Stopped,
            to: CacheState::Started,
        };
        let text = err.to_string();
        assert!(text.contains("stopped"));
        assert!(text.contains("started"));
    }

    #[test]
    fn loader_error_preserves_source() {
        let inner: BoxError = "backend unreachable".into();
        let err = CacheError::Loader(inner);
        assert!(err.to_string().contains("backend unreachable"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<CacheError>();
    }
}
