//! Pooled, shareable scratch buffers
//!
//! Amortizes allocation of reusable mutable objects (row buffers, key
//! scratch space) across many `next()` calls. Sharing is handle cloning;
//! the last handle drop returns the buffer to the pool. `exclusive()`
//! hands out `&mut T`, copying into a fresh pooled buffer first when the
//! value is co-held, so a caller never mutates a buffer another holder
//! still observes.

use parking_lot::Mutex;
use std::sync::Arc;

/// A free list of reusable buffers
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    make: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T> Pool<T> {
    pub fn new(make: impl Fn() -> T + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            free: Mutex::new(Vec::new()),
            make: Box::new(make),
        })
    }

    /// Take a buffer from the pool, creating one if the free list is empty
    pub fn acquire(self: &Arc<Self>) -> Shared<T> {
        let value = self.take();
        Shared {
            inner: Some(Arc::new(value)),
            pool: self.clone(),
        }
    }

    /// Number of buffers currently idle in the pool
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn take(&self) -> T {
        self.free.lock().pop().unwrap_or_else(|| (self.make)())
    }

    fn put(&self, value: T) {
        self.free.lock().push(value);
    }
}

/// A counted handle to a pooled buffer
pub struct Shared<T> {
    // `None` only transiently inside drop/exclusive
    inner: Option<Arc<T>>,
    pool: Arc<Pool<T>>,
}

impl<T> Shared<T> {
    /// Add a co-holder of the same buffer
    pub fn share(&self) -> Shared<T> {
        Shared {
            inner: self.inner.clone(),
            pool: self.pool.clone(),
        }
    }

    /// How many handles currently observe this buffer
    pub fn ref_count(&self) -> usize {
        self.inner.as_ref().map(Arc::strong_count).unwrap_or(0)
    }
}

impl<T: Clone> Shared<T> {
    /// Mutable access that never aliases: if the buffer is co-held, its
    /// contents move to a fresh pooled buffer first and this handle
    /// detaches from the shared one.
    pub fn exclusive(&mut self) -> &mut T {
        let unique = Arc::get_mut(self.inner.as_mut().expect("live handle")).is_some();
        if !unique {
            let copy = {
                let current = self.inner.as_ref().expect("live handle");
                let mut fresh = self.pool.take();
                fresh.clone_from(current);
                fresh
            };
            // Detach from the shared buffer; the remaining holders keep it
            self.inner = Some(Arc::new(copy));
        }
        Arc::get_mut(self.inner.as_mut().expect("live handle")).expect("uniquely held")
    }
}

impl<T> std::ops::Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner.as_ref().expect("live handle")
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        self.share()
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Some(arc) = self.inner.take() {
            // The last holder returns the buffer to the pool, exactly once
            if let Ok(value) = Arc::try_unwrap(arc) {
                self.pool.put(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returned_to_pool_exactly_once() {
        let pool: Arc<Pool<Vec<u8>>> = Pool::new(Vec::new);
        let a = pool.acquire();
        let b = a.share();
        let c = b.share();
        assert_eq!(a.ref_count(), 3);
        drop(b);
        drop(c);
        assert_eq!(pool.idle(), 0, "buffer still held");
        drop(a);
        assert_eq!(pool.idle(), 1, "last release returns it once");
    }

    #[test]
    fn test_buffers_are_reused() {
        let pool: Arc<Pool<Vec<u8>>> = Pool::new(|| Vec::with_capacity(64));
        {
            let mut h = pool.acquire();
            h.exclusive().extend_from_slice(b"scratch");
        }
        assert_eq!(pool.idle(), 1);
        let h = pool.acquire();
        assert_eq!(pool.idle(), 0);
        // Reused buffer keeps its prior contents; callers reset as needed
        assert_eq!(&*h, b"scratch");
    }

    #[test]
    fn test_exclusive_never_mutates_shared_buffer() {
        let pool: Arc<Pool<Vec<u8>>> = Pool::new(Vec::new);
        let mut a = pool.acquire();
        a.exclusive().push(1);
        let b = a.share();
        assert_eq!(a.ref_count(), 2);
        // Mutating through `a` must not change what `b` observes
        a.exclusive().push(2);
        assert_eq!(&*a, &[1, 2]);
        assert_eq!(&*b, &[1], "co-holder unaffected by exclusive write");
        assert_eq!(a.ref_count(), 1);
        assert_eq!(b.ref_count(), 1);
    }

    #[test]
    fn test_exclusive_when_unique_mutates_in_place() {
        let pool: Arc<Pool<Vec<u8>>> = Pool::new(Vec::new);
        let mut a = pool.acquire();
        a.exclusive().push(9);
        a.exclusive().push(10);
        assert_eq!(&*a, &[9, 10]);
    }
}
