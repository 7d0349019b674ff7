//! Loading-state reduction for resource views.
//!
//! Each slot of a fetch plan contributes one [`SlotSignal`]; [`reduce`] folds
//! them into the single [`ResourceStatus`] a view reports. The reduction is
//! independent of the merged data, so a view can carry both results and an
//! error at the same time.

/// Progress signal contributed by one slot of a fetch plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSignal {
    /// The request has not settled yet.
    Pending,
    /// The request settled with data.
    Settled,
    /// The request settled with an error.
    Failed,
}

/// Aggregate status of a resource view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    /// Nothing was requested; the identifier list is empty.
    Idle,
    /// At least one request is still outstanding.
    Loading,
    /// Every request settled and at least one failed.
    Failed,
    /// Every request settled with data.
    Ready,
}

impl ResourceStatus {
    /// True while at least one request is outstanding.
    ///
    /// An empty plan is [`Idle`](ResourceStatus::Idle), never loading.
    pub fn is_loading(&self) -> bool {
        matches!(self, ResourceStatus::Loading)
    }
}

/// Folds per-slot signals into one status.
///
/// An empty signal list means nothing was requested and reduces to
/// [`ResourceStatus::Idle`]. Outstanding requests take precedence over
/// failures so callers keep their loading indicator until the plan settles.
pub fn reduce(signals: &[SlotSignal]) -> ResourceStatus {
    if signals.is_empty() {
        return ResourceStatus::Idle;
    }
    if signals.contains(&SlotSignal::Pending) {
        return ResourceStatus::Loading;
    }
    if signals.contains(&SlotSignal::Failed) {
        return ResourceStatus::Failed;
    }
    ResourceStatus::Ready
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_signals_reduce_to_idle() {
        let status = reduce(&[]);
        assert_eq!(status, ResourceStatus::Idle);
        assert!(!status.is_loading());
    }

    #[test]
    fn test_any_pending_signal_reduces_to_loading() {
        let status = reduce(&[SlotSignal::Settled, SlotSignal::Pending]);
        assert_eq!(status, ResourceStatus::Loading);
        assert!(status.is_loading());
    }

    #[test]
    fn test_pending_takes_precedence_over_failed() {
        let status = reduce(&[SlotSignal::Failed, SlotSignal::Pending]);
        assert_eq!(status, ResourceStatus::Loading);
    }

    #[test]
    fn test_failed_signal_reduces_to_failed_once_settled() {
        let status = reduce(&[SlotSignal::Settled, SlotSignal::Failed]);
        assert_eq!(status, ResourceStatus::Failed);
        assert!(!status.is_loading());
    }

    #[test]
    fn test_all_settled_signals_reduce_to_ready() {
        let status = reduce(&[SlotSignal::Settled, SlotSignal::Settled]);
        assert_eq!(status, ResourceStatus::Ready);
    }
}
