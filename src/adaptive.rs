//! A hot-reloadable value: readers never block a writer and vice versa.
//!
//! Used for [`crate::config::EngineConfig`] fields the reconciler's loops
//! re-read on every tick (refresh interval, expire-check interval) so a
//! config reload never requires restarting those loops.

use std::sync::Arc;

use arc_swap::ArcSwap;

/// A value that can be replaced atomically and read without locking.
#[derive(Debug)]
pub struct Adaptive<T> {
    inner: ArcSwap<T>,
}

impl<T> Adaptive<T> {
    pub fn new(value: T) -> Self {
        Self { inner: ArcSwap::from_pointee(value) }
    }

    /// A snapshot of the current value. Cheap (an `Arc` clone); the
    /// snapshot will not reflect a `set` that happens after this call.
    pub fn get(&self) -> Arc<T> {
        self.inner.load_full()
    }

    pub fn set(&self, value: T) {
        self.inner.store(Arc::new(value));
    }
}

impl<T: Clone> Clone for Adaptive<T> {
    fn clone(&self) -> Self {
        Self::new((*self.get()).clone())
    }
}

impl<T> From<T> for Adaptive<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
