//! Pools of reusable block buffers and digest slots.

use crossbeam_channel::{Receiver, Sender};

use crate::cancel::CancelToken;

/// Thread-safe pool of reusable items, backed by an unbounded channel.
///
/// The pool never allocates on its own: it hands out what it was seeded with
/// or what has been released back. The pool owns both ends of its channel, so
/// releasing never fails and an empty pool blocks instead of disconnecting.
///
/// # Example
///
/// ```
/// use signature::{CancelToken, Pool};
///
/// let token = CancelToken::new();
/// let pool = Pool::with_items([vec![0u8; 16], vec![0u8; 16]]);
/// let buffer = pool.acquire(&token).expect("pool is seeded");
/// assert_eq!(pool.available(), 1);
/// pool.release(buffer);
/// assert_eq!(pool.available(), 2);
/// ```
#[derive(Debug)]
pub struct Pool<T> {
    free: Receiver<T>,
    returns: Sender<T>,
}

impl<T> Pool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub fn empty() -> Self {
        let (returns, free) = crossbeam_channel::unbounded();
        Self { free, returns }
    }

    /// Creates a pool seeded with `items`.
    #[must_use]
    pub fn with_items(items: impl IntoIterator<Item = T>) -> Self {
        let pool = Self::empty();
        for item in items {
            pool.release(item);
        }
        pool
    }

    /// Takes an item, blocking until one is released.
    ///
    /// Returns `None` once `token` is cancelled, even if items are free.
    pub fn acquire(&self, token: &CancelToken) -> Option<T> {
        token.recv(&self.free)
    }

    /// Takes an item without blocking.
    pub fn try_acquire(&self) -> Option<T> {
        self.free.try_recv().ok()
    }

    /// Returns an item to the pool, waking one blocked caller.
    pub fn release(&self, item: T) {
        // Cannot fail: `self.free` keeps the channel connected.
        let _ = self.returns.send(item);
    }

    /// Number of items currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn items_come_back_in_release_order() {
        let token = CancelToken::new();
        let pool = Pool::with_items([1, 2]);
        assert_eq!(pool.acquire(&token), Some(1));
        pool.release(7);
        assert_eq!(pool.acquire(&token), Some(2));
        assert_eq!(pool.acquire(&token), Some(7));
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn try_acquire_does_not_block() {
        let pool: Pool<u8> = Pool::empty();
        assert_eq!(pool.try_acquire(), None);
        pool.release(3);
        assert_eq!(pool.try_acquire(), Some(3));
    }

    #[test]
    fn cancelled_token_short_circuits() {
        let token = CancelToken::new();
        token.cancel();
        let pool = Pool::with_items([1]);
        assert_eq!(pool.acquire(&token), None);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn blocked_acquire_wakes_on_release() {
        let token = Arc::new(CancelToken::new());
        let pool = Arc::new(Pool::empty());

        let waiter = {
            let pool = Arc::clone(&pool);
            let token = Arc::clone(&token);
            thread::spawn(move || pool.acquire(&token))
        };

        thread::sleep(Duration::from_millis(20));
        pool.release(42_u32);
        assert_eq!(waiter.join().expect("waiter panicked"), Some(42));
    }

    #[test]
    fn blocked_acquire_wakes_on_cancel() {
        let token = Arc::new(CancelToken::new());
        let pool: Arc<Pool<u32>> = Arc::new(Pool::empty());

        let waiter = {
            let pool = Arc::clone(&pool);
            let token = Arc::clone(&token);
            thread::spawn(move || pool.acquire(&token))
        };

        thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        token.cancel();
        assert_eq!(waiter.join().expect("waiter panicked"), None);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
