//! Watch-published resource resolution engine.
//!
//! A [`ResourceResolver`] owns one fetch plan at a time. Applying a new
//! identifier list bumps the plan revision, resets the result slots and
//! spawns one task per planned request; every task settlement publishes a
//! fresh [`ResourceView`] on a watch channel. Requests run eagerly in
//! parallel and settle through the shared [`ResponseCache`], so duplicate
//! identifiers cost one network call.
//!
//! Superseding a plan does not abort its in-flight requests. They complete
//! into the cache for whoever asks next, and their results are dropped here
//! because their revision no longer matches.

use crate::aggregate::{MergeMemo, Slot};
use crate::sequencer::{FetchPlan, RouteFn};
use crate::status::{reduce, ResourceStatus, SlotSignal};
use chart_client::{FetchClient, FetchError, FetchResponse, ResponseCache};
use chart_types::{Identified, RestResource};
use chart_uuid::ResourceUuid;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Projects a raw response envelope into typed resources.
pub type ProjectFn<T> = fn(&FetchResponse) -> Result<Vec<T>, FetchError>;

/// Decodes a response body holding either a single resource or a list.
///
/// Single-resource URLs answer with one object while searches answer with
/// arrays, and both shapes flow through the same resolver. A `null` body
/// decodes to no resources.
pub fn decode_resources(response: &FetchResponse) -> Result<Vec<RestResource>, FetchError> {
    if response.body().is_null() {
        return Ok(Vec::new());
    }
    if response.body().is_array() {
        return response.json::<Vec<RestResource>>();
    }
    Ok(vec![response.json::<RestResource>()?])
}

/// Snapshot of a resolver's state at one point in time.
#[derive(Debug, Clone)]
pub struct ResourceView<T> {
    data: Option<Vec<T>>,
    error: Option<Arc<FetchError>>,
    status: ResourceStatus,
}

impl<T> ResourceView<T> {
    fn idle() -> Self {
        Self {
            data: Some(Vec::new()),
            error: None,
            status: ResourceStatus::Idle,
        }
    }

    /// Merged resources so far.
    ///
    /// `None` until the first request of a non-empty plan resolves.
    /// `Some` and empty when nothing was requested, or when every resolved
    /// resource was filtered out by the projection.
    pub fn data(&self) -> Option<&[T]> {
        self.data.as_deref()
    }

    /// Lowest-index failure of the current plan, independent of whatever
    /// data has resolved alongside it.
    pub fn error(&self) -> Option<&Arc<FetchError>> {
        self.error.as_ref()
    }

    pub fn status(&self) -> ResourceStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }
}

struct ResolverState<T> {
    revision: u64,
    plan: FetchPlan,
    slots: Vec<Slot<T>>,
    memo: MergeMemo<T>,
}

impl<T: Identified + Clone> ResolverState<T> {
    fn view(&mut self) -> ResourceView<T> {
        let signals: Vec<SlotSignal> = self.slots.iter().map(Slot::signal).collect();
        ResourceView {
            data: self.memo.merge(self.revision, &self.slots),
            error: self.first_error(),
            status: reduce(&signals),
        }
    }

    fn first_error(&self) -> Option<Arc<FetchError>> {
        self.slots.iter().find_map(|slot| match slot {
            Slot::Failed(error) => Some(Arc::clone(error)),
            _ => None,
        })
    }
}

/// Resolves an ordered identifier list into a published [`ResourceView`].
pub struct ResourceResolver<T> {
    client: Arc<dyn FetchClient>,
    cache: Arc<ResponseCache>,
    route: RouteFn,
    project: ProjectFn<T>,
    state: Arc<Mutex<ResolverState<T>>>,
    tx: Arc<watch::Sender<ResourceView<T>>>,
}

impl<T> ResourceResolver<T>
where
    T: Identified + Clone + Send + Sync + 'static,
{
    pub fn new(
        client: Arc<dyn FetchClient>,
        cache: Arc<ResponseCache>,
        route: RouteFn,
        project: ProjectFn<T>,
    ) -> Self {
        let (tx, _rx) = watch::channel(ResourceView::idle());
        Self {
            client,
            cache,
            route,
            project,
            state: Arc::new(Mutex::new(ResolverState {
                revision: 0,
                plan: FetchPlan::new(Vec::new(), route),
                slots: Vec::new(),
                memo: MergeMemo::new(),
            })),
            tx: Arc::new(tx),
        }
    }

    /// Replaces the identifier list, fetching one resource per identifier.
    ///
    /// Reapplying an identical list is a no-op: nothing refetches and no new
    /// view is published.
    pub async fn set_identifiers(&self, identifiers: Vec<ResourceUuid>) {
        self.apply_plan(identifiers, None).await;
    }

    /// Replaces the identifier list, fetching at most `desired` resources
    /// from the front of it.
    pub async fn set_identifiers_bounded(&self, identifiers: Vec<ResourceUuid>, desired: usize) {
        self.apply_plan(identifiers, Some(desired)).await;
    }

    async fn apply_plan(&self, identifiers: Vec<ResourceUuid>, desired: Option<usize>) {
        let mut plan = FetchPlan::new(identifiers, self.route);
        if let Some(desired) = desired {
            plan = plan.with_desired(desired);
        }

        let mut state = self.state.lock().await;
        if state.plan.identifiers() == plan.identifiers()
            && state.plan.request_count() == plan.request_count()
        {
            return;
        }

        state.revision += 1;
        let revision = state.revision;
        let count = plan.request_count();
        state.slots = vec![Slot::Pending; count];
        state.plan = plan;
        self.tx.send_replace(state.view());

        for index in 0..count {
            let Some(request) = state.plan.request_at(index) else {
                continue;
            };
            let client = Arc::clone(&self.client);
            let cache = Arc::clone(&self.cache);
            let state_handle = Arc::clone(&self.state);
            let tx = Arc::clone(&self.tx);
            let project = self.project;
            tokio::spawn(async move {
                let outcome = match cache.fetch(client.as_ref(), &request).await {
                    Ok(response) => match (project)(&response) {
                        Ok(resources) => Slot::Resolved(resources),
                        Err(error) => Slot::Failed(Arc::new(error)),
                    },
                    Err(error) => Slot::Failed(error),
                };

                let mut state = state_handle.lock().await;
                if state.revision != revision {
                    // A newer plan superseded this fetch. The response has
                    // already landed in the shared cache for whoever asks
                    // next; the slot it was meant for no longer exists.
                    return;
                }
                match state.slots.get_mut(index) {
                    Some(slot) => *slot = outcome,
                    None => return,
                }
                tx.send_replace(state.view());
            });
        }
    }

    /// Current snapshot.
    pub fn view(&self) -> ResourceView<T> {
        self.tx.borrow().clone()
    }

    /// Subscribes to snapshot updates. The receiver always starts with the
    /// latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ResourceView<T>> {
        self.tx.subscribe()
    }

    /// Waits for the current plan to settle and returns that snapshot.
    ///
    /// Returns immediately when the resolver is already idle, ready or
    /// failed.
    pub async fn settled(&self) -> ResourceView<T> {
        let mut rx = self.tx.subscribe();
        loop {
            let view = rx.borrow_and_update().clone();
            if !view.is_loading() {
                return view;
            }
            if rx.changed().await.is_err() {
                return self.tx.borrow().clone();
            }
        }
    }
}
