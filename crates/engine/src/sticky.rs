//! Sticky visitor→variant assignments.
//!
//! An assignment is committed at most once per
//! `(experiment_id, visitor_id)` and is immutable for the life of the
//! experiment; concurrent first-time requests are resolved by an
//! atomic insert-if-absent, with the losing caller reading back the
//! winner's committed value.

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

pub struct StickyStore {
    assignments: DashMap<(Uuid, String), Uuid>,
}

impl StickyStore {
    pub fn new() -> Self {
        Self {
            assignments: DashMap::new(),
        }
    }

    /// Return the committed assignment for this visitor, or run
    /// `assign` and commit its result. The entry API holds the shard
    /// lock across the check-and-insert, so exactly one caller's
    /// `assign` result is ever committed.
    pub fn get_or_assign(
        &self,
        experiment_id: Uuid,
        visitor_id: &str,
        assign: impl FnOnce() -> Uuid,
    ) -> Uuid {
        if let Some(existing) = self.assignments.get(&(experiment_id, visitor_id.to_string())) {
            return *existing;
        }
        *self
            .assignments
            .entry((experiment_id, visitor_id.to_string()))
            .or_insert_with(assign)
    }

    /// Read-only lookup; `None` when the visitor was never assigned.
    pub fn lookup(&self, experiment_id: &Uuid, visitor_id: &str) -> Option<Uuid> {
        self.assignments
            .get(&(*experiment_id, visitor_id.to_string()))
            .map(|entry| *entry)
    }

    /// Number of committed assignments for one experiment.
    pub fn assignment_count(&self, experiment_id: &Uuid) -> usize {
        self.assignments
            .iter()
            .filter(|entry| entry.key().0 == *experiment_id)
            .count()
    }

    /// Clear every assignment for one experiment (administrative
    /// reset; assignments never expire on their own).
    pub fn reset(&self, experiment_id: &Uuid) {
        self.assignments.retain(|key, _| key.0 != *experiment_id);
        debug!(experiment_id = %experiment_id, "sticky assignments reset");
    }
}

impl Default for StickyStore {
    fn default() -> Self {
        Self::new()
    }
}
