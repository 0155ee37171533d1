//! Service type hashing for the proximity beacon.
//!
//! A beacon carries two 32-bit masks, so every service type is reduced to a
//! single bit. The mapping is lossy on purpose: two service types that land in
//! the same bucket are indistinguishable on the beacon, and a beacon match is
//! only ever used as a pre-filter before the real discovery traffic starts.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Number of hash buckets carried on a beacon.
pub const DEFAULT_HASH_BUCKETS: u32 = 32;

/// Longest label allowed by DNS.
const MAX_LABEL_LEN: usize = 63;

const HASH_MULTIPLIER: u32 = 31;

/// A set of service hash bits as carried in one half of a beacon.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ServiceMask(pub u32);

impl ServiceMask {
    /// The mask of a device that is not browsing or advertising anything.
    pub const EMPTY: ServiceMask = ServiceMask(0);

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Reports whether every bit of `other` is also set in `self`.
    ///
    /// A local request with mask `other` matches a peer beacon half `self`
    /// exactly when this holds.
    pub fn contains(&self, other: ServiceMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl From<u32> for ServiceMask {
    fn from(v: u32) -> Self {
        ServiceMask(v)
    }
}

impl BitOr for ServiceMask {
    type Output = ServiceMask;

    fn bitor(self, rhs: ServiceMask) -> ServiceMask {
        ServiceMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for ServiceMask {
    fn bitor_assign(&mut self, rhs: ServiceMask) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ServiceMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Hashes a service type such as `_ipp._tcp.local.` onto a single beacon bit.
///
/// Only the service label is hashed, without its leading underscore and
/// ignoring ASCII case. Returns [`ServiceMask::EMPTY`] when the name cannot be
/// represented: no protocol label after it, no leading underscore, or a label
/// that is empty or longer than a DNS label may be.
///
/// `buckets` is clamped to `1..=32`.
pub fn service_hash(service_type: &str, buckets: u32) -> ServiceMask {
    let Some((label, rest)) = service_type.split_once('.') else {
        log::debug!("service_hash: {service_type} has no protocol label");
        return ServiceMask::EMPTY;
    };
    if rest.is_empty() || label.len() > MAX_LABEL_LEN {
        log::debug!("service_hash: malformed service type {service_type}");
        return ServiceMask::EMPTY;
    }
    let Some(label) = label.strip_prefix('_') else {
        log::debug!("service_hash: {service_type} does not begin with a _");
        return ServiceMask::EMPTY;
    };
    if label.is_empty() {
        log::debug!("service_hash: empty service label in {service_type}");
        return ServiceMask::EMPTY;
    }

    let buckets = buckets.clamp(1, DEFAULT_HASH_BUCKETS);
    let hash = label_hash(label.as_bytes()) % buckets;
    log::trace!("service_hash: {} characters hashed to {hash}", label.len());

    ServiceMask(1 << hash)
}

/// Strips the instance label from a service instance name, leaving the
/// service type that is hashed for an advertisement.
///
/// `printer._ipp._tcp.local.` becomes `_ipp._tcp.local.`.
pub fn instance_service_type(instance_name: &str) -> Option<&str> {
    instance_name
        .split_once('.')
        .map(|(_, rest)| rest)
        .filter(|rest| !rest.is_empty())
}

fn label_hash(label: &[u8]) -> u32 {
    label.iter().fold(0u32, |hash, c| {
        hash.wrapping_mul(HASH_MULTIPLIER)
            .wrapping_add(c.to_ascii_lowercase() as u32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_hash_ignores_case() {
        let lower = service_hash("_ipp._tcp.local.", DEFAULT_HASH_BUCKETS);
        let upper = service_hash("_IPP._tcp.local.", DEFAULT_HASH_BUCKETS);
        let mixed = service_hash("_IpP._TCP.LOCAL.", DEFAULT_HASH_BUCKETS);
        assert!(!lower.is_empty());
        assert_eq!(lower, upper);
        assert_eq!(lower, mixed);
    }

    #[test]
    fn test_service_hash_is_single_bit() {
        for name in ["_ipp._tcp", "_http._tcp.local.", "_airplay._tcp.local.", "_a._udp"] {
            let mask = service_hash(name, DEFAULT_HASH_BUCKETS);
            assert_eq!(mask.0.count_ones(), 1, "{name} hashed to {mask}");
        }
    }

    #[test]
    fn test_service_hash_known_value() {
        // "ipp": ((105 * 31) + 112) * 31 + 112 = 104489, and 104489 % 32 = 9.
        assert_eq!(
            service_hash("_ipp._tcp.local.", DEFAULT_HASH_BUCKETS),
            ServiceMask(1 << 9)
        );
    }

    #[test]
    fn test_service_hash_only_uses_service_label() {
        assert_eq!(
            service_hash("_ipp._tcp.local.", DEFAULT_HASH_BUCKETS),
            service_hash("_ipp._udp.example.", DEFAULT_HASH_BUCKETS)
        );
    }

    #[test]
    fn test_service_hash_degenerate_input() {
        assert!(service_hash("ipp._tcp.local.", 32).is_empty());
        assert!(service_hash("_._tcp.local.", 32).is_empty());
        assert!(service_hash("_ipp", 32).is_empty());
        assert!(service_hash("_ipp.", 32).is_empty());
        assert!(service_hash("", 32).is_empty());
        let long = format!("_{}._tcp.local.", "x".repeat(63));
        assert!(service_hash(&long, 32).is_empty());
    }

    #[test]
    fn test_service_hash_bucket_count() {
        assert_eq!(service_hash("_ipp._tcp", 1), ServiceMask(1));
        let mask = service_hash("_ipp._tcp", 4);
        assert!(mask.0 < (1 << 4));
        // Out of range bucket counts are clamped.
        assert_eq!(service_hash("_ipp._tcp", 0), ServiceMask(1));
        assert_eq!(service_hash("_ipp._tcp", 64), service_hash("_ipp._tcp", 32));
    }

    #[test]
    fn test_instance_service_type() {
        assert_eq!(
            instance_service_type("printer._ipp._tcp.local."),
            Some("_ipp._tcp.local.")
        );
        assert_eq!(instance_service_type("printer."), None);
        assert_eq!(instance_service_type("printer"), None);
        assert_eq!(
            service_hash(instance_service_type("Office._IPP._tcp.local.").unwrap(), 32),
            service_hash("_ipp._tcp.local.", 32)
        );
    }

    #[test]
    fn test_service_mask_contains() {
        let peer = ServiceMask(0x21);
        assert!(peer.contains(ServiceMask(0x20)));
        assert!(peer.contains(ServiceMask(0x01)));
        assert!(!peer.contains(ServiceMask(0x02)));
        assert!(!ServiceMask::EMPTY.contains(ServiceMask(0x20)));
        assert_eq!(ServiceMask(0x20) | ServiceMask(0x01), peer);
        assert_eq!(ServiceMask(0x20).to_string(), "0x00000020");
    }
}
