//! Fetch planning for ordered identifier lists.
//!
//! A [`FetchPlan`] decides, up front, which requests a resource resolver will
//! issue: one per identifier, in list order, optionally capped at a desired
//! count. Plans are pure data; building one performs no I/O.

use chart_client::RequestDescriptor;
use chart_uuid::ResourceUuid;

/// Builds the request for one identifier.
pub type RouteFn = fn(&ResourceUuid) -> RequestDescriptor;

/// An ordered fetch plan over a list of resource identifiers.
///
/// Slot `index` always maps to `identifiers[index]`, so the plan never
/// reorders and never issues a request beyond the identifier list, whatever
/// the desired count says.
#[derive(Debug, Clone)]
pub struct FetchPlan {
    identifiers: Vec<ResourceUuid>,
    desired: usize,
    route: RouteFn,
}

impl FetchPlan {
    /// Plans one request per identifier.
    pub fn new(identifiers: Vec<ResourceUuid>, route: RouteFn) -> Self {
        let desired = identifiers.len();
        Self {
            identifiers,
            desired,
            route,
        }
    }

    /// Caps the plan at `desired` requests. A cap beyond the identifier
    /// count behaves like the full list.
    pub fn with_desired(mut self, desired: usize) -> Self {
        self.desired = desired;
        self
    }

    /// Number of requests this plan issues.
    pub fn request_count(&self) -> usize {
        self.desired.min(self.identifiers.len())
    }

    /// The request for slot `index`, or `None` past the planned range.
    pub fn request_at(&self, index: usize) -> Option<RequestDescriptor> {
        if index < self.request_count() {
            Some((self.route)(&self.identifiers[index]))
        } else {
            None
        }
    }

    /// All planned requests in slot order.
    pub fn requests(&self) -> impl Iterator<Item = RequestDescriptor> + '_ {
        (0..self.request_count()).map(|index| (self.route)(&self.identifiers[index]))
    }

    pub fn identifiers(&self) -> &[ResourceUuid] {
        &self.identifiers
    }

    pub fn is_empty(&self) -> bool {
        self.request_count() == 0
    }
}
