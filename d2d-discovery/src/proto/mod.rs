//! Sans-I/O proximity discovery engine.
//!
//! This module provides [`Discovery`], the context object that owns every
//! piece of beacon discovery state and implements the [`sansio::Protocol`]
//! trait for integration with any I/O framework.
//!
//! # Overview
//!
//! [`Discovery`] performs no I/O and calls nobody. The caller is responsible
//! for:
//!
//! 1. **Local requests**: calling [`Discovery::start_browse`],
//!    [`Discovery::start_advertise`] and their stop counterparts as browses
//!    and registrations come and go
//! 2. **Radio**: feeding received peer beacons to `handle_read()` and
//!    carrying out [`RadioCommand`]s from `poll_write()`
//! 3. **Plugins**: feeding plugin found/lost callbacks to `handle_event()`
//!    and carrying out [`DiscoveryEvent`]s from `poll_event()`
//! 4. **Timing**: calling `handle_timeout()` when `poll_timeout()` expires
//!
//! # Example
//!
//! ```rust
//! use d2d_discovery::{
//!     Beacon, BrowseRequest, Discovery, DiscoveryConfig, DiscoveryEvent, EthAddr, InterfaceId,
//!     RadioCommand, ServiceFlags, TransportMessage,
//! };
//! use sansio::Protocol;
//! use std::time::Instant;
//!
//! let mut discovery = Discovery::new(DiscoveryConfig::default());
//! discovery
//!     .start_browse(BrowseRequest {
//!         service_type: "_ipp._tcp.local.".to_string(),
//!         handle: 1,
//!         interface: InterfaceId::Ble,
//!         flags: ServiceFlags::NONE,
//!     })
//!     .unwrap();
//!
//! // The new browse bit is published on the beacon.
//! let Some(RadioCommand::PublishBeacon { browse, .. }) = discovery.poll_write() else {
//!     panic!("expected a beacon update");
//! };
//!
//! // A peer advertising that bit is seen.
//! discovery
//!     .handle_read(TransportMessage {
//!         now: Instant::now(),
//!         peer_addr: EthAddr::new([2, 0, 0, 0, 0, 1]),
//!         message: Beacon::new(Default::default(), browse),
//!     })
//!     .unwrap();
//!
//! // A presence-only record is registered for the browse.
//! assert!(matches!(
//!     discovery.poll_event(),
//!     Some(DiscoveryEvent::RegisterRecord(_))
//! ));
//! ```

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::time::Instant;

use bytes::Bytes;
use shared::error::{Error, Result};
use shared::util::{HEX_DUMP_LIMIT, hex_dump};
use shared::{EthAddr, TransportMessage};

use crate::beacon::{Beacon, BeaconAggregator};
use crate::config::DiscoveryConfig;
use crate::hash::{ServiceMask, instance_service_type};
use crate::matcher;
use crate::message::DnsType;
use crate::peer::{Observation, PeerResponseTable};
use crate::record::synth::RecordSynthesizer;
use crate::record::table::{AddOutcome, ExternalRecordTable, InstanceHandle, SynthesizedRecord};
use crate::record::{Record, encode_key, encode_record, placeholder_value};
use crate::registry::{
    Category, LocalRequest, Promotion, QueryHandle, RegistrationHandle, Released, RequestId,
    RequestOwner, RequestRegistry, RequestSpec, SavedAttributes, ServiceKey,
};
use crate::transport::{
    InterfaceId, RecordScope, ServiceFlags, Transport, TransportSelector, applies_to_beacon,
    is_auto,
};

/// A peer beacon as delivered by the radio layer.
pub type TaggedBeacon = TransportMessage<Beacon>;

/// Instance handle stamped on placeholder records, which no plugin owns.
const PLACEHOLDER_HANDLE: InstanceHandle = 0;

/// Callbacks from external transport plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginEvent {
    /// A plugin discovered a record.
    ServiceFound {
        transport: Transport,
        instance: InstanceHandle,
        key: Bytes,
        value: Bytes,
    },
    /// A record previously reported by a plugin went away.
    ServiceLost {
        transport: Transport,
        instance: InstanceHandle,
        key: Bytes,
        value: Bytes,
    },
}

/// Instructions for the beacon radio.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RadioCommand {
    /// Start or keep beaconing with these masks.
    PublishBeacon {
        browse: ServiceMask,
        advertise: ServiceMask,
    },
    /// Stop beaconing altogether.
    StopBeacon,
}

/// Side effects for the collaborators around the engine: transport plugins,
/// the shared record cache and the query/registration engine.
///
/// Poll for events using [`poll_event()`](sansio::Protocol::poll_event) after
/// any call into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// Ask a plugin to browse for `key`.
    StartBrowsing { key: Bytes, transport: Transport },
    StopBrowsing { key: Bytes, transport: Transport },
    /// Ask a plugin to advertise the record encoded as `key` and `value`.
    StartAdvertising {
        key: Bytes,
        value: Bytes,
        transport: Transport,
    },
    StopAdvertising {
        key: Bytes,
        value: Bytes,
        transport: Transport,
    },
    /// Add a record to the shared cache.
    RegisterRecord(SynthesizedRecord),
    /// Remove a record from the shared cache.
    DeregisterRecord(SynthesizedRecord),
    /// Restart a live query with a new set of transport flags.
    RestartQuery {
        handle: QueryHandle,
        flags: ServiceFlags,
    },
    /// Re-announce a registration with a new record scope.
    RestartRegistration {
        handle: RegistrationHandle,
        scope: RecordScope,
    },
}

impl fmt::Display for DiscoveryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryEvent::StartBrowsing { key, transport } => {
                write!(f, "start browsing {} on {transport}", hex_dump(key, HEX_DUMP_LIMIT))
            }
            DiscoveryEvent::StopBrowsing { key, transport } => {
                write!(f, "stop browsing {} on {transport}", hex_dump(key, HEX_DUMP_LIMIT))
            }
            DiscoveryEvent::StartAdvertising { key, transport, .. } => write!(
                f,
                "start advertising {} on {transport}",
                hex_dump(key, HEX_DUMP_LIMIT)
            ),
            DiscoveryEvent::StopAdvertising { key, transport, .. } => write!(
                f,
                "stop advertising {} on {transport}",
                hex_dump(key, HEX_DUMP_LIMIT)
            ),
            DiscoveryEvent::RegisterRecord(r) => write!(f, "register {r}"),
            DiscoveryEvent::DeregisterRecord(r) => write!(f, "deregister {r}"),
            DiscoveryEvent::RestartQuery { handle, flags } => {
                write!(f, "restart query {handle} with flags {flags}")
            }
            DiscoveryEvent::RestartRegistration { handle, scope } => {
                write!(f, "restart registration {handle} with scope {scope:?}")
            }
        }
    }
}

/// A browse as seen by the engine.
#[derive(Debug, Clone)]
pub struct BrowseRequest {
    /// Service type such as `_ipp._tcp.local.`.
    pub service_type: String,
    pub handle: QueryHandle,
    pub interface: InterfaceId,
    pub flags: ServiceFlags,
}

/// A record registration as seen by the engine.
///
/// Only SRV registrations take part in beacon discovery; `records` carries
/// the PTR, SRV and TXT records that are mirrored to plugins on promotion.
#[derive(Debug, Clone)]
pub struct AdvertiseRequest {
    /// Service instance name such as `printer._ipp._tcp.local.`.
    pub instance_name: String,
    pub rr_type: DnsType,
    pub handle: RegistrationHandle,
    pub interface: InterfaceId,
    pub flags: ServiceFlags,
    pub scope: RecordScope,
    pub records: Vec<Record>,
}

/// Sans-I/O beacon discovery engine.
///
/// Owns the request registry, the outgoing beacon, the per-peer beacon table
/// and the table of records injected on behalf of plugins. Every mutation
/// happens through `&mut self`; share it between contexts with
/// [`SharedDiscovery`](crate::SharedDiscovery).
pub struct Discovery {
    config: DiscoveryConfig,
    registry: RequestRegistry,
    beacon: BeaconAggregator,
    peers: PeerResponseTable,
    selector: TransportSelector,
    synthesizer: RecordSynthesizer,
    records: ExternalRecordTable,

    /// Service names already reported as unrepresentable.
    unrepresentable: HashSet<String>,

    write_outs: VecDeque<RadioCommand>,
    event_outs: VecDeque<DiscoveryEvent>,

    /// When the radio should be told to stop after the beacon went empty.
    stop_deadline: Option<Instant>,

    closed: bool,
}

impl Discovery {
    /// Create a new engine with the given configuration.
    pub fn new(config: DiscoveryConfig) -> Self {
        let registry = RequestRegistry::new(config.hash_buckets);
        let synthesizer = RecordSynthesizer::new(config.record_ttl, config.carrier_capacity);
        Self {
            config,
            registry,
            beacon: BeaconAggregator::new(),
            peers: PeerResponseTable::new(),
            selector: TransportSelector::new(),
            synthesizer,
            records: ExternalRecordTable::new(),
            unrepresentable: HashSet::new(),
            write_outs: VecDeque::new(),
            event_outs: VecDeque::new(),
            stop_deadline: None,
            closed: false,
        }
    }

    /// Associates an interface index with the transport serving it.
    pub fn register_interface(&mut self, index: u32, transport: Transport) {
        self.selector.register_interface(index, transport);
    }

    /// Start taking part in beacon discovery for a browse.
    ///
    /// Repeated browses for the same service type share one request; each
    /// must be balanced by a [`stop_browse`](Self::stop_browse).
    ///
    /// # Errors
    ///
    /// * [`Error::ErrNotBeaconEligible`] unless the browse is on the beacon
    ///   interface or is an auto-triggered browse on any interface.
    /// * [`Error::ErrHashUnrepresentable`] when the service type cannot be
    ///   put on the beacon. The browse still runs elsewhere; it is just never
    ///   matched.
    pub fn start_browse(&mut self, request: BrowseRequest) -> Result<RequestId> {
        self.check_usable()?;
        if !applies_to_beacon(request.interface, request.flags) {
            log::trace!(
                "browse for {} on {:?} does not use the beacon",
                request.service_type,
                request.interface
            );
            return Err(Error::ErrNotBeaconEligible);
        }

        let key = ServiceKey::browse(&request.service_type);
        let beacon_key = encode_key(key.name(), DnsType::Ptr)?;
        self.acquire(RequestSpec {
            key,
            owner: RequestOwner::Query {
                handle: request.handle,
                flags: request.flags,
            },
            interface: request.interface,
            beacon_key,
        })
    }

    /// Drop one reference on the browse for `service_type`.
    ///
    /// Returns whether a request was found. When the last reference goes,
    /// any promotion is reversed and the records injected for the browse are
    /// deregistered before this returns.
    pub fn stop_browse(&mut self, service_type: &str) -> Result<bool> {
        self.check_usable()?;
        Ok(self.release(&ServiceKey::browse(service_type)))
    }

    /// Start taking part in beacon discovery for a registration.
    ///
    /// The beacon bit is derived from the service type, so all instances of
    /// one service type share one request.
    ///
    /// # Errors
    ///
    /// Same as [`start_browse`](Self::start_browse); additionally only SRV
    /// registrations are eligible.
    pub fn start_advertise(&mut self, request: AdvertiseRequest) -> Result<RequestId> {
        self.check_usable()?;
        if request.rr_type != DnsType::Srv || !applies_to_beacon(request.interface, request.flags)
        {
            log::trace!(
                "{} {} registration on {:?} does not use the beacon",
                request.instance_name,
                request.rr_type,
                request.interface
            );
            return Err(Error::ErrNotBeaconEligible);
        }

        let Some(service_type) = instance_service_type(&request.instance_name) else {
            return Err(self.unrepresentable(&request.instance_name));
        };
        let key = ServiceKey::advertise(service_type);
        let beacon_key = encode_key(key.name(), DnsType::Ptr)?;
        self.acquire(RequestSpec {
            key,
            owner: RequestOwner::Registration {
                handle: request.handle,
                flags: request.flags,
                scope: request.scope,
                records: request.records,
            },
            interface: request.interface,
            beacon_key,
        })
    }

    /// Drop one reference on the registration of `instance_name`.
    ///
    /// Returns `Ok(false)` for record types that never entered the beacon
    /// path and for unknown names.
    pub fn stop_advertise(&mut self, instance_name: &str, rr_type: DnsType) -> Result<bool> {
        self.check_usable()?;
        if rr_type != DnsType::Srv {
            return Ok(false);
        }
        let Some(service_type) = instance_service_type(instance_name) else {
            return Ok(false);
        };
        Ok(self.release(&ServiceKey::advertise(service_type)))
    }

    /// Number of live local requests.
    pub fn request_count(&self) -> usize {
        self.registry.len()
    }

    /// Looks up the live request for a service type.
    pub fn find_request(&self, service_type: &str, category: Category) -> Option<RequestId> {
        self.registry
            .find(&ServiceKey::new(service_type, category))
            .map(|r| r.id)
    }

    /// Whether at least one peer's beacon currently matches request `id`.
    pub fn is_matched(&self, id: RequestId) -> bool {
        self.match_count(id) > 0
    }

    /// Number of peers whose beacon currently matches request `id`.
    pub fn match_count(&self, id: RequestId) -> usize {
        self.registry.get(id).map_or(0, |r| r.match_count)
    }

    /// Whether request `id` is currently promoted onto the scarce transport.
    pub fn is_promoted(&self, id: RequestId) -> bool {
        self.registry
            .get(id)
            .is_some_and(|r| r.promotion != Promotion::None)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn external_record_count(&self) -> usize {
        self.records.len()
    }

    pub fn external_records(&self) -> impl Iterator<Item = &SynthesizedRecord> {
        self.records.iter()
    }

    /// The beacon last handed to the radio.
    pub fn beacon(&self) -> Beacon {
        self.beacon.current()
    }

    pub fn is_beaconing(&self) -> bool {
        self.beacon.is_running()
    }

    fn check_usable(&self) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        if !self.config.enabled {
            log::debug!("beacon discovery is disabled");
            return Err(Error::ErrDiscoveryDisabled);
        }
        Ok(())
    }

    fn unrepresentable(&mut self, name: &str) -> Error {
        if self.unrepresentable.insert(name.to_ascii_lowercase()) {
            log::warn!("{name} cannot be represented on the beacon, it will never be matched");
        }
        Error::ErrHashUnrepresentable(name.to_owned())
    }

    fn acquire(&mut self, spec: RequestSpec) -> Result<RequestId> {
        let category = spec.key.category();
        let acquired = match self.registry.acquire(spec) {
            Ok(acquired) => acquired,
            Err(Error::ErrHashUnrepresentable(name)) => return Err(self.unrepresentable(&name)),
            Err(err) => return Err(err),
        };
        if !acquired.first {
            return Ok(acquired.id);
        }

        let Some(mask) = self.registry.get(acquired.id).map(|r| r.mask) else {
            return Ok(acquired.id);
        };
        if let Some(beacon) = self.beacon.add(category, mask) {
            self.publish(beacon);
        }
        // Peers already beaconing this bit are evaluated again on their next
        // beacon even if it is unchanged.
        self.peers.rearm(category, mask);
        Ok(acquired.id)
    }

    fn release(&mut self, key: &ServiceKey) -> bool {
        match self.registry.release(key) {
            None => false,
            Some(Released::Remaining { .. }) => true,
            Some(Released::Last(mut request)) => {
                self.retire(&mut request);
                true
            }
        }
    }

    /// Undoes everything a request caused once its last reference is gone.
    fn retire(&mut self, request: &mut LocalRequest) {
        if request.match_count > 0 {
            self.effects().deactivate(request);
        }
        self.peers.forget_request(request.id);

        if request.key.category() == Category::Browse {
            for removed in self.records.remove_matching(request.key.name(), DnsType::Ptr) {
                log::debug!("flushing {removed} with its browse");
                self.event_outs
                    .push_back(DiscoveryEvent::DeregisterRecord(removed));
            }
        }

        if let Some(beacon) = self.beacon.recompute(&self.registry) {
            self.publish(beacon);
        }
        if self.registry.is_empty() {
            log::debug!("no local requests left, dropping {} peers", self.peers.len());
            self.peers.clear();
        }
    }

    fn publish(&mut self, beacon: Beacon) {
        log::info!("publishing beacon {beacon}");
        self.write_outs.push_back(RadioCommand::PublishBeacon {
            browse: beacon.browse,
            advertise: beacon.advertise,
        });
        self.stop_deadline = if beacon.is_empty() {
            Some(Instant::now() + self.config.beacon_stop_delay)
        } else {
            None
        };
    }

    fn effects(&mut self) -> Effects<'_> {
        Effects {
            selector: &self.selector,
            synthesizer: &self.synthesizer,
            records: &mut self.records,
            events: &mut self.event_outs,
        }
    }

    fn process_beacon(&mut self, msg: TaggedBeacon) {
        let addr = msg.peer_addr;
        let Beacon { browse, advertise } = msg.message;
        match self.peers.observe(addr, browse, advertise) {
            Observation::Ignored => {
                log::trace!("ignoring empty beacon from unknown peer {addr}");
                return;
            }
            Observation::Unchanged => {
                log::trace!("beacon from {addr} unchanged");
                return;
            }
            Observation::Changed => {}
        }

        // Browse side first: activating a browse may start a query whose
        // advertise side evaluation must see the updated browse state.
        self.apply_transitions(addr, Category::Browse);
        self.apply_transitions(addr, Category::Advertise);

        if browse.is_empty() && advertise.is_empty() {
            self.peers.remove(&addr);
        }
    }

    fn apply_transitions(&mut self, addr: EthAddr, category: Category) {
        let Some(peer) = self.peers.get_mut(&addr) else {
            return;
        };
        let peer_mask = peer.mask_for(category);
        let transitions = matcher::evaluate(&self.registry, peer, category, peer_mask);
        if transitions.is_empty() {
            return;
        }

        let mut activate = vec![];
        for id in transitions.matched {
            peer.matched.insert(id);
            if let Some(request) = self.registry.get_mut(id) {
                request.match_count += 1;
                if request.match_count == 1 {
                    activate.push(id);
                }
            }
        }
        let mut deactivate = vec![];
        for id in transitions.unmatched {
            peer.matched.remove(&id);
            if let Some(request) = self.registry.get_mut(id) {
                request.match_count = request.match_count.saturating_sub(1);
                if request.match_count == 0 {
                    deactivate.push(id);
                }
            }
        }

        let mut effects = Effects {
            selector: &self.selector,
            synthesizer: &self.synthesizer,
            records: &mut self.records,
            events: &mut self.event_outs,
        };
        for id in activate {
            if let Some(request) = self.registry.get_mut(id) {
                effects.activate(request);
            }
        }
        for id in deactivate {
            if let Some(request) = self.registry.get_mut(id) {
                effects.deactivate(request);
            }
        }
    }

    fn service_found(
        &mut self,
        transport: Transport,
        instance: InstanceHandle,
        key: &[u8],
        value: &[u8],
    ) {
        let record = match self.synthesizer.synthesize(key, value) {
            Ok(record) => record,
            Err(err) => return drop_plugin_input("found", transport, &err, key, value),
        };
        let synthesized = SynthesizedRecord {
            record: record.clone(),
            transport,
            instance,
        };
        match self.records.add_or_skip(record, transport, instance) {
            AddOutcome::Added => {
                log::debug!("{synthesized} found");
                self.event_outs
                    .push_back(DiscoveryEvent::RegisterRecord(synthesized));
            }
            AddOutcome::DuplicateSuppressed => {}
        }
    }

    fn service_lost(
        &mut self,
        transport: Transport,
        instance: InstanceHandle,
        key: &[u8],
        value: &[u8],
    ) {
        let record = match self.synthesizer.synthesize(key, value) {
            Ok(record) => record,
            Err(err) => return drop_plugin_input("lost", transport, &err, key, value),
        };
        match self.records.remove_if_present(&record) {
            Some(removed) => {
                log::debug!("{removed} lost");
                self.event_outs
                    .push_back(DiscoveryEvent::DeregisterRecord(removed));
            }
            None => log::warn!(
                "lost event for unknown record {record} via {transport} (instance {instance})"
            ),
        }
    }
}

fn drop_plugin_input(what: &str, transport: Transport, err: &Error, key: &[u8], value: &[u8]) {
    if err.is_parse_error() {
        log::warn!(
            "dropping {what} event from {transport}: {err}; key {} value {}",
            hex_dump(key, HEX_DUMP_LIMIT),
            hex_dump(value, HEX_DUMP_LIMIT)
        );
    } else {
        log::error!("failed to decode {what} event from {transport}: {err}");
    }
}

/// The parts of the engine touched by activation and deactivation, borrowed
/// apart from the registry that holds the request being changed.
struct Effects<'a> {
    selector: &'a TransportSelector,
    synthesizer: &'a RecordSynthesizer,
    records: &'a mut ExternalRecordTable,
    events: &'a mut VecDeque<DiscoveryEvent>,
}

impl Effects<'_> {
    /// First peer matched `request`.
    fn activate(&mut self, request: &mut LocalRequest) {
        log::info!("{} {}: matched by a peer", request.key, request.id);

        if request.interface == InterfaceId::Ble {
            if request.key.category() == Category::Browse {
                self.inject_placeholder(request);
            }
            return;
        }
        if !is_auto(request.interface, request.owner.flags()) {
            return;
        }

        match &mut request.owner {
            RequestOwner::Query { handle, flags } => {
                if flags.contains(ServiceFlags::INCLUDE_AWDL) {
                    log::debug!("{}: query already includes {}", request.key, Transport::SCARCE);
                    return;
                }
                let saved = *flags;
                let widened = saved | ServiceFlags::INCLUDE_AWDL;
                *flags = widened;
                self.events.push_back(DiscoveryEvent::RestartQuery {
                    handle: *handle,
                    flags: widened,
                });
                for transport in self.selector.widened(request.interface, saved, widened) {
                    self.events.push_back(DiscoveryEvent::StartBrowsing {
                        key: request.beacon_key.clone(),
                        transport,
                    });
                }
                request.promotion = Promotion::Promoted {
                    transport: Transport::SCARCE,
                    saved: SavedAttributes::Flags(saved),
                };
            }
            RequestOwner::Registration {
                handle,
                scope,
                records,
                ..
            } => {
                if scope.includes_awdl() {
                    log::debug!(
                        "{}: registration already includes {}",
                        request.key,
                        Transport::SCARCE
                    );
                    return;
                }
                let saved = *scope;
                *scope = saved.with_awdl();
                self.events.push_back(DiscoveryEvent::RestartRegistration {
                    handle: *handle,
                    scope: *scope,
                });
                for record in records.iter() {
                    match encode_record(record) {
                        Ok((key, value)) => self.events.push_back(DiscoveryEvent::StartAdvertising {
                            key,
                            value,
                            transport: Transport::SCARCE,
                        }),
                        Err(err) => log::error!("failed to encode {record}: {err}"),
                    }
                }
                request.promotion = Promotion::Promoted {
                    transport: Transport::SCARCE,
                    saved: SavedAttributes::Scope(saved),
                };
            }
        }
        log::info!("{} {}: promoted onto {}", request.key, request.id, Transport::SCARCE);
    }

    /// Last matching peer went away from `request`.
    fn deactivate(&mut self, request: &mut LocalRequest) {
        log::info!("{} {}: no longer matched by any peer", request.key, request.id);

        if request.interface == InterfaceId::Ble {
            if request.key.category() == Category::Browse {
                self.remove_placeholder(request);
            }
            return;
        }

        let Promotion::Promoted { transport, saved } = std::mem::take(&mut request.promotion)
        else {
            return;
        };
        match (&mut request.owner, saved) {
            (RequestOwner::Query { handle, flags }, SavedAttributes::Flags(saved)) => {
                for transport in self.selector.widened(request.interface, saved, *flags) {
                    self.events.push_back(DiscoveryEvent::StopBrowsing {
                        key: request.beacon_key.clone(),
                        transport,
                    });
                }
                *flags = saved;
                self.events.push_back(DiscoveryEvent::RestartQuery {
                    handle: *handle,
                    flags: saved,
                });
            }
            (
                RequestOwner::Registration {
                    handle,
                    scope,
                    records,
                    ..
                },
                SavedAttributes::Scope(saved),
            ) => {
                *scope = saved;
                self.events.push_back(DiscoveryEvent::RestartRegistration {
                    handle: *handle,
                    scope: saved,
                });
                for record in records.iter() {
                    match encode_record(record) {
                        Ok((key, value)) => self.events.push_back(DiscoveryEvent::StopAdvertising {
                            key,
                            value,
                            transport,
                        }),
                        Err(err) => log::error!("failed to encode {record}: {err}"),
                    }
                }
            }
            (owner, saved) => {
                log::error!("{}: cannot restore {saved:?} onto {owner:?}", request.key);
                return;
            }
        }
        log::info!("{} {}: demoted from {transport}", request.key, request.id);
    }

    fn placeholder(&self, request: &LocalRequest) -> Option<Record> {
        match self
            .synthesizer
            .synthesize(&request.beacon_key, &placeholder_value())
        {
            Ok(record) => Some(record),
            Err(err) => {
                log::error!("{}: failed to build placeholder: {err}", request.key);
                None
            }
        }
    }

    fn inject_placeholder(&mut self, request: &LocalRequest) {
        let Some(record) = self.placeholder(request) else {
            return;
        };
        let synthesized = SynthesizedRecord {
            record: record.clone(),
            transport: Transport::Ble,
            instance: PLACEHOLDER_HANDLE,
        };
        if self
            .records
            .add_or_skip(record, Transport::Ble, PLACEHOLDER_HANDLE)
            == AddOutcome::Added
        {
            log::debug!("{}: injecting placeholder", request.key);
            self.events
                .push_back(DiscoveryEvent::RegisterRecord(synthesized));
        }
    }

    fn remove_placeholder(&mut self, request: &LocalRequest) {
        let Some(record) = self.placeholder(request) else {
            return;
        };
        if let Some(removed) = self.records.remove_if_present(&record) {
            log::debug!("{}: removing placeholder", request.key);
            self.events
                .push_back(DiscoveryEvent::DeregisterRecord(removed));
        }
    }
}

impl sansio::Protocol<TaggedBeacon, (), PluginEvent> for Discovery {
    type Rout = ();
    type Wout = RadioCommand;
    type Eout = DiscoveryEvent;
    type Error = Error;
    type Time = Instant;

    /// Process a beacon received from a peer.
    ///
    /// Identical repeats are ignored. Otherwise every local request is
    /// matched against the new masks and the resulting activations and
    /// deactivations are queued as events.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ErrConnectionClosed`] if the engine has been closed.
    fn handle_read(&mut self, msg: TaggedBeacon) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        self.process_beacon(msg);
        Ok(())
    }

    /// Matches are reported through `poll_event()`.
    fn poll_read(&mut self) -> Option<Self::Rout> {
        None
    }

    /// Not used; requests are started through the `start_*` methods.
    fn handle_write(&mut self, _msg: ()) -> Result<()> {
        Ok(())
    }

    /// Get the next command for the beacon radio.
    fn poll_write(&mut self) -> Option<Self::Wout> {
        self.write_outs.pop_front()
    }

    /// Process a plugin callback.
    ///
    /// Malformed keys and values are logged with a hex dump and dropped;
    /// they are never reported as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ErrConnectionClosed`] if the engine has been closed.
    fn handle_event(&mut self, evt: PluginEvent) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        match evt {
            PluginEvent::ServiceFound {
                transport,
                instance,
                key,
                value,
            } => self.service_found(transport, instance, &key, &value),
            PluginEvent::ServiceLost {
                transport,
                instance,
                key,
                value,
            } => self.service_lost(transport, instance, &key, &value),
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Option<Self::Eout> {
        self.event_outs.pop_front()
    }

    /// Stops the radio once the empty beacon has been on air long enough.
    fn handle_timeout(&mut self, now: Self::Time) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }

        if let Some(deadline) = self.stop_deadline
            && deadline <= now
        {
            self.stop_deadline = None;
            if self.beacon.is_running() && self.beacon.current().is_empty() {
                log::info!("stopping beacon");
                self.beacon.stop();
                self.write_outs.push_back(RadioCommand::StopBeacon);
            }
        }
        Ok(())
    }

    fn poll_timeout(&mut self) -> Option<Self::Time> {
        self.stop_deadline
    }

    /// Close the engine.
    ///
    /// All requests, peers and injected records are forgotten and queued
    /// output is discarded. Later calls fail with
    /// [`Error::ErrConnectionClosed`].
    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.registry.clear();
        self.peers.clear();
        self.records.clear();
        self.beacon.reset();
        self.unrepresentable.clear();
        self.write_outs.clear();
        self.event_outs.clear();
        self.stop_deadline = None;
        Ok(())
    }
}
