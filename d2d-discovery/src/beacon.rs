//! Outgoing beacon state.

use std::fmt;

use crate::hash::ServiceMask;
use crate::registry::{Category, RequestRegistry};

/// The two masks a device broadcasts: what it browses for and what it
/// advertises.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Beacon {
    pub browse: ServiceMask,
    pub advertise: ServiceMask,
}

impl Beacon {
    pub fn new(browse: ServiceMask, advertise: ServiceMask) -> Self {
        Self { browse, advertise }
    }

    pub fn is_empty(&self) -> bool {
        self.browse.is_empty() && self.advertise.is_empty()
    }
}

impl fmt::Display for Beacon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "browse {} advertise {}", self.browse, self.advertise)
    }
}

/// Folds the masks of all active requests into the published beacon.
#[derive(Default, Debug)]
pub struct BeaconAggregator {
    current: Beacon,
    running: bool,
}

impl BeaconAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one bit on the beacon after a request was created. Returns the
    /// new beacon if it changed.
    pub fn add(&mut self, category: Category, mask: ServiceMask) -> Option<Beacon> {
        let mut next = self.current;
        match category {
            Category::Browse => next.browse |= mask,
            Category::Advertise => next.advertise |= mask,
        }
        if next == self.current {
            log::trace!("{category} bit {mask} already set on beacon");
            return None;
        }
        self.publish(next)
    }

    /// Rebuilds the beacon from every remaining request. Bits cannot be
    /// cleared incrementally since several requests may share one.
    pub fn recompute(&mut self, registry: &RequestRegistry) -> Option<Beacon> {
        let next = Beacon::new(
            registry.combined_mask(Category::Browse),
            registry.combined_mask(Category::Advertise),
        );
        if next == self.current {
            return None;
        }
        self.publish(next)
    }

    fn publish(&mut self, next: Beacon) -> Option<Beacon> {
        log::debug!("beacon {} -> {}", self.current, next);
        self.current = next;
        self.running = true;
        Some(next)
    }

    pub fn current(&self) -> Beacon {
        self.current
    }

    /// Whether the radio has been told to beacon and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self) {
        self.current = Beacon::default();
        self.running = false;
    }
}
