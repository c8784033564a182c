use std::time::Duration;

use tokio::time::Instant;

/// A wholesale-replaced cache value and the moment it was stored.
#[derive(Debug, Clone)]
pub struct CacheSnapshot<T> {
    pub data: T,
    pub inserted_at: Instant,
}

impl<T> CacheSnapshot<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            inserted_at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }

    /// A snapshot is fresh while its age is strictly below `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}
