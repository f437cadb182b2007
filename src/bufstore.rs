//! The global buffer-store capacity counter (spec §5): decremented when
//! a connection acquires its buffer allotment, incremented when that
//! connection is fully torn down. Modeled as an injected collaborator
//! per spec §9's design note on global singletons, rather than a
//! process-wide static.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Inner {
    available: AtomicUsize,
}

/// Shared, cheaply cloned handle to the engine's buffer-capacity pool.
#[derive(Debug, Clone)]
pub struct BufferStore {
    inner: Arc<Inner>,
}

impl BufferStore {
    pub fn new(capacity: usize) -> Self {
        BufferStore {
            inner: Arc::new(Inner {
                available: AtomicUsize::new(capacity),
            }),
        }
    }

    pub fn available(&self) -> usize {
        self.inner.available.load(Ordering::Acquire)
    }

    /// Takes one connection's worth of buffer capacity. `None` if the
    /// store is exhausted — callers should refuse the open rather than
    /// silently exceed the global bound.
    pub fn acquire(&self) -> Option<BufferLease> {
        let mut current = self.inner.available.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return None;
            }
            match self.inner.available.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(BufferLease {
                        inner: self.inner.clone(),
                    })
                }
                Err(observed) => current = observed,
            }
        }
    }
}

/// Held by a `Connection` for its whole lifetime; dropping it (when the
/// connection leaves TIME-WAIT or is destroyed by RST/abort) returns
/// its slot to the pool.
#[derive(Debug)]
pub struct BufferLease {
    inner: Arc<Inner>,
}

impl Drop for BufferLease {
    fn drop(&mut self) {
        self.inner.available.fetch_add(1, Ordering::AcqRel);
    }
}
