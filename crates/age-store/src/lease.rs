//! Per-artifact-id exclusive leases
//!
//! Single-writer-per-id discipline for mutating calls. A lease is a
//! short-lived exclusive claim keyed by artifact id: acquired before the
//! current status is read, released (success or failure) before the call
//! returns. A second contender fails fast with `ConcurrentModification`
//! rather than silently overwriting, and a lease held past its TTL ceiling
//! is treated the same way at commit time, never as silent forgiveness.

use age_artifact::{ArtifactId, GovernanceError};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::{Duration, Instant};
use ulid::Ulid;

#[derive(Debug, Clone, Copy)]
struct LeaseEntry {
    token: Ulid,
    expires_at: Instant,
}

/// Registry of active leases, keyed by artifact id
#[derive(Debug)]
pub struct LeaseTable {
    leases: DashMap<ArtifactId, LeaseEntry>,
    ttl: Duration,
}

impl LeaseTable {
    /// Create a table with the given hold-time ceiling
    #[inline]
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            leases: DashMap::new(),
            ttl,
        }
    }

    /// Acquire the lease for `id`, failing fast on contention
    ///
    /// An expired lease left behind by a stalled writer is reclaimed.
    ///
    /// # Errors
    /// Returns [`GovernanceError::ConcurrentModification`] if another
    /// unexpired lease is active for the same id.
    pub fn acquire(&self, id: ArtifactId) -> Result<LeaseGuard<'_>, GovernanceError> {
        let token = Ulid::new();
        let now = Instant::now();
        let entry = LeaseEntry {
            token,
            expires_at: now + self.ttl,
        };

        match self.leases.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            Entry::Occupied(mut slot) => {
                if slot.get().expires_at > now {
                    return Err(GovernanceError::ConcurrentModification { id });
                }
                // Stalled holder past its ceiling: reclaim.
                slot.insert(entry);
            }
        }

        Ok(LeaseGuard {
            table: self,
            id,
            token,
            expires_at: entry.expires_at,
        })
    }

    /// Number of currently-registered leases (expired ones included)
    #[inline]
    #[must_use]
    pub fn active(&self) -> usize {
        self.leases.len()
    }

    fn release(&self, id: ArtifactId, token: Ulid) {
        self.leases.remove_if(&id, |_, entry| entry.token == token);
    }
}

/// Exclusive hold on one artifact id; released on drop
#[derive(Debug)]
pub struct LeaseGuard<'a> {
    table: &'a LeaseTable,
    id: ArtifactId,
    token: Ulid,
    expires_at: Instant,
}

impl LeaseGuard<'_> {
    /// Leased artifact id
    #[inline]
    #[must_use]
    pub fn id(&self) -> ArtifactId {
        self.id
    }

    /// Confirm the lease is still within its ceiling
    ///
    /// Called immediately before commit: a writer that held past the TTL
    /// must not be allowed to land its batch.
    ///
    /// # Errors
    /// Returns [`GovernanceError::ConcurrentModification`] if the lease
    /// expired while held.
    pub fn check(&self) -> Result<(), GovernanceError> {
        if Instant::now() > self.expires_at {
            return Err(GovernanceError::ConcurrentModification { id: self.id });
        }
        Ok(())
    }
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        self.table.release(self.id, self.token);
    }
}
