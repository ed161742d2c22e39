//! Generation-based cancellation for asynchronous continuations.
//!
//! A [`CancellationScope`] hands out [`CancellationToken`]s.
//! Invalidating the scope invalidates every token handed out so far,
//! while tokens obtained afterwards are valid again.
//! Continuations check their token before touching any state;
//! nothing is aborted underneath them.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Clone, Debug, Default)]
pub struct CancellationScope {
    generation: Arc<AtomicU64>,
}

impl CancellationScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a token that stays valid until the next call to [`Self::invalidate()`].
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            generation: Arc::clone(&self.generation),
            issued_at: self.generation.load(Ordering::Acquire),
        }
    }

    /// Invalidates all tokens issued so far.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

#[derive(Clone, Debug)]
pub struct CancellationToken {
    generation: Arc<AtomicU64>,
    issued_at: u64,
}

impl CancellationToken {
    pub fn is_valid(&self) -> bool {
        self.generation.load(Ordering::Acquire) == self.issued_at
    }
}
