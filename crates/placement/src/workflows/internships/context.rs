use std::sync::Arc;

use crate::config::PlacementLimits;

use super::repository::{Clock, NotificationSink, PlacementStore};

/// Collaborators shared by every placement component, built once per process.
pub struct PlacementContext<S, N> {
    pub store: Arc<S>,
    pub notices: Arc<N>,
    pub clock: Arc<dyn Clock>,
    pub limits: PlacementLimits,
}

impl<S, N> PlacementContext<S, N>
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(
        store: Arc<S>,
        notices: Arc<N>,
        clock: Arc<dyn Clock>,
        limits: PlacementLimits,
    ) -> Self {
        Self {
            store,
            notices,
            clock,
            limits,
        }
    }
}

impl<S, N> Clone for PlacementContext<S, N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notices: Arc::clone(&self.notices),
            clock: Arc::clone(&self.clock),
            limits: self.limits,
        }
    }
}
