//! Ordered aggregation of per-identifier fetch results.
//!
//! A fetch plan resolves one slot per requested identifier. [`merge_ordered`]
//! flattens the settled slots into a single list whose order follows the plan,
//! regardless of the order in which responses arrived. [`MergeMemo`] caches
//! the merge so rebuilding an unchanged view costs nothing.

use crate::status::SlotSignal;
use chart_client::FetchError;
use chart_types::Identified;
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome slot for one identifier in a fetch plan.
#[derive(Debug, Clone)]
pub enum Slot<T> {
    /// The fetch has not settled yet.
    Pending,
    /// The fetch settled and decoded to zero or more resources.
    Resolved(Vec<T>),
    /// The fetch failed.
    Failed(Arc<FetchError>),
}

impl<T> Slot<T> {
    pub fn signal(&self) -> SlotSignal {
        match self {
            Slot::Pending => SlotSignal::Pending,
            Slot::Resolved(_) => SlotSignal::Settled,
            Slot::Failed(_) => SlotSignal::Failed,
        }
    }
}

/// Merges settled slots into one list, following slot order.
///
/// Returns `None` while a non-empty plan has no resolved slot yet, which is
/// the "no data so far" state. An empty plan merges to `Some(vec![])`: zero
/// requested resources is a result, not the absence of one. Resources sharing
/// an identifier keep their first occurrence.
pub fn merge_ordered<T: Identified + Clone>(slots: &[Slot<T>]) -> Option<Vec<T>> {
    if slots.is_empty() {
        return Some(Vec::new());
    }
    if !slots.iter().any(|slot| matches!(slot, Slot::Resolved(_))) {
        return None;
    }

    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for slot in slots {
        if let Slot::Resolved(resources) = slot {
            for resource in resources {
                if seen.insert(resource.uuid().to_string()) {
                    merged.push(resource.clone());
                }
            }
        }
    }
    Some(merged)
}

#[derive(Debug, PartialEq, Eq)]
struct MergeKey {
    revision: u64,
    signals: Vec<SlotSignal>,
}

/// Memoises [`merge_ordered`] across repeated view builds.
///
/// The merge is pure in the plan revision and the per-slot progress signals:
/// within one revision a slot's content is fixed once it settles, so the two
/// together identify the merge input exactly.
#[derive(Debug)]
pub struct MergeMemo<T> {
    key: Option<MergeKey>,
    value: Option<Vec<T>>,
}

impl<T> Default for MergeMemo<T> {
    fn default() -> Self {
        Self {
            key: None,
            value: None,
        }
    }
}

impl<T: Identified + Clone> MergeMemo<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the merged list for `slots`, recomputing only when the inputs
    /// changed since the previous call.
    pub fn merge(&mut self, revision: u64, slots: &[Slot<T>]) -> Option<Vec<T>> {
        let key = MergeKey {
            revision,
            signals: slots.iter().map(Slot::signal).collect(),
        };
        if self.key.as_ref() != Some(&key) {
            self.value = merge_ordered(slots);
            self.key = Some(key);
        }
        self.value.clone()
    }
}
