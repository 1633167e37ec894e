//! Generation tokens for asynchronous passes.
//!
//! A pass (a page load, an unread fetch) captures a [`PassToken`] before its first
//! suspension point and checks it after every one. Any later [`StalenessGuard::invalidate`]
//! or [`StalenessGuard::supersede`] bumps the generation, so the old pass finds its token
//! stale and drops its results instead of writing them.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

/// The pass was superseded while it was suspended
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("stale pass: generation {captured} superseded by {current}")]
pub struct Stale {
    /// Generation the pass started in
    pub captured: u64,
    /// Generation at the time of the check
    pub current: u64,
}

/// Generation counter of one collection
#[derive(Clone, Debug, Default)]
pub struct StalenessGuard {
    generation: Arc<AtomicU64>,
}

impl StalenessGuard {
    /// Creates a guard at generation 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Captures a token for a pass that coexists with the current one
    pub fn begin(&self) -> PassToken {
        PassToken {
            generation: self.generation.clone(),
            captured: self.generation(),
        }
    }

    /// Invalidates every outstanding pass and starts a new one
    pub fn supersede(&self) -> PassToken {
        let captured = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        PassToken {
            generation: self.generation.clone(),
            captured,
        }
    }

    /// Invalidates every outstanding pass
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// Proof that a pass started in some generation
#[derive(Clone, Debug)]
pub struct PassToken {
    generation: Arc<AtomicU64>,
    captured: u64,
}

impl PassToken {
    /// Generation the pass started in
    pub fn captured(&self) -> u64 {
        self.captured
    }

    /// Returns true while nothing superseded the pass
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::Acquire) == self.captured
    }

    /// `Err(Stale)` once the pass was superseded
    pub fn check(&self) -> Result<(), Stale> {
        let current = self.generation.load(Ordering::Acquire);
        if current == self.captured {
            Ok(())
        } else {
            Err(Stale {
                captured: self.captured,
                current,
            })
        }
    }

    /// Awaits `fut`, then checks the token
    pub async fn resume<F: Future>(&self, fut: F) -> Result<F::Output, Stale> {
        let output = fut.await;
        self.check()?;
        Ok(output)
    }
}
