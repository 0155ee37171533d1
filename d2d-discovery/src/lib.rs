//! # d2d-discovery
//!
//! A sans-I/O implementation of beacon triggered proximity service discovery
//! for Rust.
//!
//! Devices broadcast a tiny beacon: two 32-bit masks saying which service
//! types they browse for and which they advertise, one hash bit per service
//! type. When a peer's beacon matches a local request the request is widened
//! onto a proximity transport and the real discovery traffic starts there.
//! Records reported by transport plugins as opaque (key, value) byte pairs are
//! decoded with the regular DNS record reader and handed to the record cache.
//!
//! ## Sans-I/O Design
//!
//! [`Discovery`] implements the [`sansio::Protocol`] trait. It never touches
//! a radio, a plugin or a cache; the caller is responsible for:
//!
//! 1. Passing received peer beacons to `handle_read()`
//! 2. Passing plugin found/lost callbacks to `handle_event()`
//! 3. Carrying out [`RadioCommand`]s returned by `poll_write()`
//! 4. Carrying out [`DiscoveryEvent`]s returned by `poll_event()`
//! 5. Calling `handle_timeout()` when `poll_timeout()` expires
//!
//! ## Event Loop Pattern
//!
//! ```text
//! loop {
//!     while let Some(cmd) = discovery.poll_write() {
//!         radio.apply(cmd);
//!     }
//!     while let Some(event) = discovery.poll_event() {
//!         match event {
//!             DiscoveryEvent::RegisterRecord(r) => cache.register(r),
//!             DiscoveryEvent::StartBrowsing { key, transport } => plugins.browse(key, transport),
//!             /* ... */
//!         }
//!     }
//!     select! {
//!         beacon = radio.recv() => discovery.handle_read(beacon),
//!         evt = plugins.recv() => discovery.handle_event(evt),
//!         _ = sleep_until(discovery.poll_timeout()) => discovery.handle_timeout(Instant::now()),
//!     }
//! }
//! ```
//!
//! When callbacks arrive on other threads, wrap the engine in
//! [`SharedDiscovery`] and let the event loop wait on
//! [`SharedDiscovery::notified`].
//!
//! ## Plugin keys
//!
//! ```rust
//! use d2d_discovery::{DnsType, encode_key};
//!
//! let key = encode_key("_ipp._tcp.local.", DnsType::Ptr).unwrap();
//! assert_eq!(&key[..], b"\x04_ipp\xc0\x0c\x00\x0c\x01");
//! ```

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub(crate) mod beacon;
pub(crate) mod config;
pub(crate) mod handle;
pub(crate) mod hash;
pub(crate) mod matcher;
pub(crate) mod message;
pub(crate) mod peer;
pub(crate) mod proto;
pub(crate) mod record;
pub(crate) mod registry;
pub(crate) mod transport;

pub use beacon::Beacon;
pub use config::DiscoveryConfig;
pub use handle::{DiscoveryGuard, SharedDiscovery};
pub use hash::{DEFAULT_HASH_BUCKETS, ServiceMask, instance_service_type, service_hash};
pub use message::{DNSCLASS_INET, DnsClass, DnsType};
pub use proto::{
    AdvertiseRequest, BrowseRequest, Discovery, DiscoveryEvent, PluginEvent, RadioCommand,
    TaggedBeacon,
};
pub use record::synth::RecordSynthesizer;
pub use record::table::{AddOutcome, ExternalRecordTable, InstanceHandle, SynthesizedRecord};
pub use record::{
    CARRIER_KEY_OFFSET, KEY_FORMAT_VERSION, PLACEHOLDER_INSTANCE, Record, encode_key,
    encode_record, placeholder_value,
};
pub use registry::{Category, QueryHandle, RegistrationHandle, RequestId};
pub use transport::{InterfaceId, RecordScope, ServiceFlags, Transport};

pub use shared::{EthAddr, TransportMessage};
