//! Last known beacon of every nearby peer.

use std::collections::{BTreeSet, HashMap};

use shared::EthAddr;

use crate::hash::ServiceMask;
use crate::registry::{Category, RequestId};

/// What this device knows about one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    pub addr: EthAddr,
    pub browse: ServiceMask,
    pub advertise: ServiceMask,
    /// Local requests currently matched by this peer's beacon.
    pub matched: BTreeSet<RequestId>,
    /// Set when a new local request could match this peer; the next beacon
    /// is evaluated even if it repeats the stored masks.
    pub rearmed: bool,
}

impl PeerRecord {
    fn new(addr: EthAddr, browse: ServiceMask, advertise: ServiceMask) -> Self {
        Self {
            addr,
            browse,
            advertise,
            matched: BTreeSet::new(),
            rearmed: false,
        }
    }

    /// The half of this peer's beacon that local requests of `category`
    /// are matched against.
    pub fn mask_for(&self, category: Category) -> ServiceMask {
        match category {
            Category::Browse => self.advertise,
            Category::Advertise => self.browse,
        }
    }
}

/// How an incoming beacon relates to what was known about its sender.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Observation {
    /// An unknown peer that is neither browsing nor advertising.
    Ignored,
    /// Same masks as the last beacon from this peer.
    Unchanged,
    /// New peer or new masks; matches must be recomputed.
    Changed,
}

#[derive(Default, Debug)]
pub struct PeerResponseTable {
    peers: HashMap<EthAddr, PeerRecord>,
}

impl PeerResponseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a beacon from `addr` and reports whether it needs processing.
    pub fn observe(
        &mut self,
        addr: EthAddr,
        browse: ServiceMask,
        advertise: ServiceMask,
    ) -> Observation {
        match self.peers.get_mut(&addr) {
            None if browse.is_empty() && advertise.is_empty() => Observation::Ignored,
            None => {
                log::debug!("first beacon from {addr}: browse {browse} advertise {advertise}");
                self.peers
                    .insert(addr, PeerRecord::new(addr, browse, advertise));
                Observation::Changed
            }
            Some(peer)
                if !peer.rearmed && peer.browse == browse && peer.advertise == advertise =>
            {
                Observation::Unchanged
            }
            Some(peer) => {
                log::debug!("updated beacon from {addr}: browse {browse} advertise {advertise}");
                peer.browse = browse;
                peer.advertise = advertise;
                peer.rearmed = false;
                Observation::Changed
            }
        }
    }

    /// Marks every peer whose last beacon would match a newly created
    /// request, so that the next beacon from such a peer is evaluated even
    /// if it repeats the previous one. Stored masks are left untouched.
    pub fn rearm(&mut self, category: Category, mask: ServiceMask) {
        for peer in self.peers.values_mut() {
            if peer.mask_for(category).contains(mask) {
                log::trace!("rearming {} for new {category} request", peer.addr);
                peer.rearmed = true;
            }
        }
    }

    /// Removes a released request from every matched set.
    pub fn forget_request(&mut self, id: RequestId) {
        for peer in self.peers.values_mut() {
            peer.matched.remove(&id);
        }
    }

    pub fn get(&self, addr: &EthAddr) -> Option<&PeerRecord> {
        self.peers.get(addr)
    }

    pub fn get_mut(&mut self, addr: &EthAddr) -> Option<&mut PeerRecord> {
        self.peers.get_mut(addr)
    }

    pub fn remove(&mut self, addr: &EthAddr) -> Option<PeerRecord> {
        log::debug!("removing peer {addr}");
        self.peers.remove(addr)
    }

    /// Number of peers whose beacon currently matches request `id`.
    pub fn matching_peers(&self, id: RequestId) -> usize {
        self.peers
            .values()
            .filter(|p| p.matched.contains(&id))
            .count()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }
}
