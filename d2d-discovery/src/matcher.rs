//! Beacon match computation.

use crate::hash::ServiceMask;
use crate::peer::PeerRecord;
use crate::registry::{Category, RequestId, RequestRegistry};

/// Requests whose match state against one peer changed.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Transitions {
    /// Newly matched by the peer.
    pub matched: Vec<RequestId>,
    /// Matched before, not any more.
    pub unmatched: Vec<RequestId>,
}

impl Transitions {
    pub fn is_empty(&self) -> bool {
        self.matched.is_empty() && self.unmatched.is_empty()
    }
}

/// Compares every request of `category` against `peer_mask` and the peer's
/// current matched set.
///
/// A request matches when all of its mask bits are present in `peer_mask`.
/// The result is computed from scratch; nothing is modified.
pub fn evaluate(
    registry: &RequestRegistry,
    peer: &PeerRecord,
    category: Category,
    peer_mask: ServiceMask,
) -> Transitions {
    let mut transitions = Transitions::default();
    for request in registry.iter(category) {
        let was_matched = peer.matched.contains(&request.id);
        if peer_mask.contains(request.mask) {
            if !was_matched {
                log::trace!(
                    "{} matched {} {}",
                    peer.addr,
                    request.key,
                    request.id
                );
                transitions.matched.push(request.id);
            }
        } else if was_matched {
            log::trace!(
                "{} no longer matches {} {}",
                peer.addr,
                request.key,
                request.id
            );
            transitions.unmatched.push(request.id);
        }
    }
    transitions
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use shared::EthAddr;

    use super::*;
    use crate::hash::service_hash;
    use crate::peer::PeerResponseTable;
    use crate::registry::{RequestOwner, RequestSpec, ServiceKey};
    use crate::transport::{InterfaceId, ServiceFlags};

    fn acquire(registry: &mut RequestRegistry, key: ServiceKey) -> RequestId {
        registry
            .acquire(RequestSpec {
                key,
                owner: RequestOwner::Query {
                    handle: 0,
                    flags: ServiceFlags::AUTO_TRIGGER,
                },
                interface: InterfaceId::Any,
                beacon_key: Bytes::new(),
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_evaluate_transitions() {
        let mut registry = RequestRegistry::new(32);
        let ipp = acquire(&mut registry, ServiceKey::browse("_ipp._tcp.local."));
        let http = acquire(&mut registry, ServiceKey::browse("_http._tcp.local."));
        let ipp_mask = service_hash("_ipp._tcp.local.", 32);
        let http_mask = service_hash("_http._tcp.local.", 32);
        assert_ne!(ipp_mask, http_mask);

        let addr = EthAddr::new([1, 2, 3, 4, 5, 6]);
        let mut peers = PeerResponseTable::new();
        peers.observe(addr, ServiceMask::EMPTY, ipp_mask);
        let peer = peers.get_mut(&addr).unwrap();

        let t = evaluate(&registry, peer, Category::Browse, ipp_mask);
        assert_eq!(t.matched, vec![ipp]);
        assert!(t.unmatched.is_empty());
        peer.matched.insert(ipp);

        // Same mask again: nothing changes.
        assert!(evaluate(&registry, peer, Category::Browse, ipp_mask).is_empty());

        let t = evaluate(&registry, peer, Category::Browse, http_mask);
        assert_eq!(t.matched, vec![http]);
        assert_eq!(t.unmatched, vec![ipp]);

        // Advertise requests are not considered for the browse half.
        assert!(evaluate(&registry, peer, Category::Advertise, ipp_mask).is_empty());
    }
}
