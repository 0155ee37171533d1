//! Transport selection for proximity discovery.
//!
//! Decides which external transport plugins a request is mirrored to and
//! whether it takes part in beacon matching at all.

use std::collections::HashMap;
use std::fmt;
use std::ops::BitOr;

/// A proximity medium served by an external plugin or by the beacon radio.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Transport {
    Bluetooth,
    WifiPeerToPeer,
    /// Apple Wireless Direct Link. A limited, shared radio resource that is
    /// only used when a request opts in.
    Awdl,
    /// The low energy beacon itself. Never a plugin target.
    Ble,
}

impl Transport {
    /// The transport excluded unless explicitly requested.
    pub const SCARCE: Transport = Transport::Awdl;

    /// Transports reachable through plugins, in the order they are started.
    pub const PLUGINS: [Transport; 3] = [
        Transport::Bluetooth,
        Transport::WifiPeerToPeer,
        Transport::Awdl,
    ];
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Transport::Bluetooth => "Bluetooth",
            Transport::WifiPeerToPeer => "WiFiP2P",
            Transport::Awdl => "AWDL",
            Transport::Ble => "BLE",
        };
        write!(f, "{s}")
    }
}

/// The interface a browse or registration was bound to by its client.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum InterfaceId {
    /// Any interface, the usual case.
    #[default]
    Any,
    LocalOnly,
    /// Any peer-to-peer capable interface.
    P2p,
    /// Presence detection over the beacon only.
    Ble,
    /// A specific interface by index.
    Index(u32),
}

/// Client supplied service flags relevant to transport selection.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ServiceFlags(pub u32);

impl ServiceFlags {
    pub const NONE: ServiceFlags = ServiceFlags(0);
    /// Widen the request onto the scarce transport once a peer beacon matches.
    pub const AUTO_TRIGGER: ServiceFlags = ServiceFlags(0x1);
    pub const INCLUDE_P2P: ServiceFlags = ServiceFlags(0x20000);
    pub const INCLUDE_AWDL: ServiceFlags = ServiceFlags(0x100000);

    pub fn contains(&self, other: ServiceFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ServiceFlags {
    type Output = ServiceFlags;

    fn bitor(self, rhs: ServiceFlags) -> ServiceFlags {
        ServiceFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for ServiceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Which interfaces the records of a registration are published on.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RecordScope {
    #[default]
    Any,
    AnyIncludeP2p,
    AnyIncludeAwdl,
    AnyIncludeAwdlAndP2p,
    LocalOnly,
    P2p,
}

impl RecordScope {
    pub fn includes_awdl(&self) -> bool {
        matches!(
            self,
            RecordScope::AnyIncludeAwdl | RecordScope::AnyIncludeAwdlAndP2p
        )
    }

    /// The scope used while a registration is promoted onto the scarce
    /// transport. A P2P scope stays P2P capable.
    pub fn with_awdl(&self) -> RecordScope {
        match self {
            RecordScope::AnyIncludeP2p | RecordScope::AnyIncludeAwdlAndP2p => {
                RecordScope::AnyIncludeAwdlAndP2p
            }
            _ => RecordScope::AnyIncludeAwdl,
        }
    }
}

/// The outcome of mapping an interface and flags onto plugin transports.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportTarget {
    Only(Transport),
    AllExcept(Transport),
    All,
    None,
}

impl TransportTarget {
    /// Expands the target into the concrete plugin transports it names.
    pub fn transports(&self) -> Vec<Transport> {
        match *self {
            TransportTarget::Only(t) => vec![t],
            TransportTarget::AllExcept(excluded) => Transport::PLUGINS
                .into_iter()
                .filter(|t| *t != excluded)
                .collect(),
            TransportTarget::All => Transport::PLUGINS.to_vec(),
            TransportTarget::None => vec![],
        }
    }

    pub fn includes(&self, transport: Transport) -> bool {
        self.transports().contains(&transport)
    }
}

/// Maps client interfaces and flags onto transports.
#[derive(Default, Debug, Clone)]
pub struct TransportSelector {
    interfaces: HashMap<u32, Transport>,
}

impl TransportSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates an interface index with the transport that serves it.
    pub fn register_interface(&mut self, index: u32, transport: Transport) {
        log::debug!("interface {index} is served by {transport}");
        self.interfaces.insert(index, transport);
    }

    pub fn unregister_interface(&mut self, index: u32) -> Option<Transport> {
        self.interfaces.remove(&index)
    }

    /// Maps an interface and flags to the transports a request runs over.
    ///
    /// Requests on any interface use every plugin transport except the
    /// scarce one unless [`ServiceFlags::INCLUDE_AWDL`] is set.
    pub fn map_interface(&self, interface: InterfaceId, flags: ServiceFlags) -> TransportTarget {
        match interface {
            InterfaceId::Ble => TransportTarget::Only(Transport::Ble),
            InterfaceId::P2p => TransportTarget::AllExcept(Transport::SCARCE),
            InterfaceId::Any if flags.contains(ServiceFlags::INCLUDE_AWDL) => TransportTarget::All,
            InterfaceId::Any => TransportTarget::AllExcept(Transport::SCARCE),
            InterfaceId::Index(index) => match self.interfaces.get(&index) {
                Some(transport) => TransportTarget::Only(*transport),
                None => TransportTarget::None,
            },
            InterfaceId::LocalOnly => TransportTarget::None,
        }
    }

    /// Plugin transports gained by moving a request from `before` to `after`
    /// flags on the same interface.
    pub fn widened(
        &self,
        interface: InterfaceId,
        before: ServiceFlags,
        after: ServiceFlags,
    ) -> Vec<Transport> {
        let before = self.map_interface(interface, before);
        self.map_interface(interface, after)
            .transports()
            .into_iter()
            .filter(|t| !before.includes(*t))
            .collect()
    }
}

/// Reports whether a request takes part in beacon matching.
pub fn applies_to_beacon(interface: InterfaceId, flags: ServiceFlags) -> bool {
    interface == InterfaceId::Ble || is_auto(interface, flags)
}

/// Reports whether a request is promoted onto the scarce transport when a
/// peer beacon matches it.
pub fn is_auto(interface: InterfaceId, flags: ServiceFlags) -> bool {
    interface == InterfaceId::Any && flags.contains(ServiceFlags::AUTO_TRIGGER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_interface_any_excludes_scarce_by_default() {
        let selector = TransportSelector::new();
        let target = selector.map_interface(InterfaceId::Any, ServiceFlags::NONE);
        assert_eq!(target, TransportTarget::AllExcept(Transport::Awdl));
        assert_eq!(
            target.transports(),
            vec![Transport::Bluetooth, Transport::WifiPeerToPeer]
        );
    }

    #[test]
    fn test_map_interface_any_include_awdl() {
        let selector = TransportSelector::new();
        let target = selector.map_interface(InterfaceId::Any, ServiceFlags::INCLUDE_AWDL);
        assert_eq!(target, TransportTarget::All);
        assert!(target.includes(Transport::Awdl));
        assert!(!target.includes(Transport::Ble));
    }

    #[test]
    fn test_map_interface_concrete() {
        let mut selector = TransportSelector::new();
        selector.register_interface(7, Transport::WifiPeerToPeer);

        assert_eq!(
            selector.map_interface(InterfaceId::Ble, ServiceFlags::NONE),
            TransportTarget::Only(Transport::Ble)
        );
        assert_eq!(
            selector.map_interface(InterfaceId::P2p, ServiceFlags::INCLUDE_AWDL),
            TransportTarget::AllExcept(Transport::Awdl)
        );
        assert_eq!(
            selector.map_interface(InterfaceId::Index(7), ServiceFlags::NONE),
            TransportTarget::Only(Transport::WifiPeerToPeer)
        );
        assert_eq!(
            selector.map_interface(InterfaceId::Index(8), ServiceFlags::NONE),
            TransportTarget::None
        );
        assert_eq!(
            selector.map_interface(InterfaceId::LocalOnly, ServiceFlags::NONE),
            TransportTarget::None
        );
        assert!(TransportTarget::None.transports().is_empty());

        assert_eq!(selector.unregister_interface(7), Some(Transport::WifiPeerToPeer));
        assert_eq!(
            selector.map_interface(InterfaceId::Index(7), ServiceFlags::NONE),
            TransportTarget::None
        );
    }

    #[test]
    fn test_widened_adds_only_scarce_transport() {
        let selector = TransportSelector::new();
        let flags = ServiceFlags::AUTO_TRIGGER;
        assert_eq!(
            selector.widened(InterfaceId::Any, flags, flags | ServiceFlags::INCLUDE_AWDL),
            vec![Transport::Awdl]
        );
        assert!(
            selector
                .widened(InterfaceId::P2p, flags, flags | ServiceFlags::INCLUDE_AWDL)
                .is_empty()
        );
    }

    #[test]
    fn test_applies_to_beacon() {
        assert!(applies_to_beacon(InterfaceId::Ble, ServiceFlags::NONE));
        assert!(applies_to_beacon(InterfaceId::Any, ServiceFlags::AUTO_TRIGGER));
        assert!(!applies_to_beacon(InterfaceId::Any, ServiceFlags::NONE));
        assert!(!applies_to_beacon(InterfaceId::P2p, ServiceFlags::AUTO_TRIGGER));

        assert!(is_auto(InterfaceId::Any, ServiceFlags::AUTO_TRIGGER));
        assert!(!is_auto(InterfaceId::Ble, ServiceFlags::AUTO_TRIGGER));
    }

    #[test]
    fn test_record_scope_with_awdl() {
        assert_eq!(RecordScope::Any.with_awdl(), RecordScope::AnyIncludeAwdl);
        assert_eq!(
            RecordScope::AnyIncludeP2p.with_awdl(),
            RecordScope::AnyIncludeAwdlAndP2p
        );
        assert!(RecordScope::AnyIncludeAwdlAndP2p.includes_awdl());
        assert!(!RecordScope::AnyIncludeP2p.includes_awdl());
    }
}
