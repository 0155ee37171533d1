//! Configuration for the proximity discovery engine.
//!
//! This module provides the [`DiscoveryConfig`] struct.
//!
//! # Examples
//!
//! ```rust
//! use d2d_discovery::DiscoveryConfig;
//! use std::time::Duration;
//!
//! let config = DiscoveryConfig::default()
//!     .with_beacon_stop_delay(Duration::from_secs(1))
//!     .with_record_ttl(4500);
//! ```

use std::time::Duration;

use crate::hash::DEFAULT_HASH_BUCKETS;

/// Default delay between publishing an empty beacon and stopping the radio.
pub(crate) const DEFAULT_BEACON_STOP_DELAY: Duration = Duration::from_secs(3);

/// Default TTL (Time To Live) of records synthesized from plugin events
/// (120 seconds).
pub(crate) const DEFAULT_RECORD_TTL: u32 = 120;

/// Default size of the carrier buffer plugin records are decoded in.
pub(crate) const DEFAULT_CARRIER_CAPACITY: usize = 512;

/// Configuration for a [`Discovery`](crate::Discovery) engine.
///
/// Use the builder pattern to construct a configuration:
///
/// ```rust
/// use d2d_discovery::DiscoveryConfig;
///
/// let config = DiscoveryConfig::new()
///     .with_hash_buckets(16)
///     .with_carrier_capacity(1024);
/// assert_eq!(config.hash_buckets, 16);
/// ```
///
/// # Fields
///
/// - `enabled`: master switch for beacon based discovery (default: true)
/// - `beacon_stop_delay`: how long the empty beacon stays on air (default: 3 seconds)
/// - `hash_buckets`: number of beacon bits service types are hashed onto (default: 32)
/// - `record_ttl`: TTL of synthesized records (default: 120 seconds)
/// - `carrier_capacity`: largest plugin record that can be decoded (default: 512 bytes)
#[derive(Clone, Debug)]
pub struct DiscoveryConfig {
    /// When false, every start and stop call fails with
    /// [`ErrDiscoveryDisabled`](shared::error::Error::ErrDiscoveryDisabled)
    /// and nothing is published.
    pub enabled: bool,

    /// Once the last request is gone the all-zero beacon is published right
    /// away so peers see the withdrawal. The radio is told to stop only after
    /// this delay.
    ///
    /// Default: 3 seconds
    pub beacon_stop_delay: Duration,

    /// Number of buckets service types are hashed into. Values outside
    /// `1..=32` are clamped. Fewer buckets mean more collisions, which only
    /// ever cause spurious matches.
    ///
    /// Default: 32
    pub hash_buckets: u32,

    /// TTL written into records decoded from plugin events.
    ///
    /// Default: 120 seconds
    pub record_ttl: u32,

    /// Capacity of the carrier buffer. Plugin records that would not fit are
    /// dropped.
    ///
    /// Default: 512 bytes
    pub carrier_capacity: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            beacon_stop_delay: DEFAULT_BEACON_STOP_DELAY,
            hash_buckets: DEFAULT_HASH_BUCKETS,
            record_ttl: DEFAULT_RECORD_TTL,
            carrier_capacity: DEFAULT_CARRIER_CAPACITY,
        }
    }
}

impl DiscoveryConfig {
    /// Create a new configuration with default values.
    ///
    /// Equivalent to [`DiscoveryConfig::default()`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable beacon based discovery.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the delay between publishing the empty beacon and stopping the
    /// radio.
    ///
    /// # Example
    ///
    /// ```rust
    /// use d2d_discovery::DiscoveryConfig;
    /// use std::time::Duration;
    ///
    /// let config = DiscoveryConfig::default()
    ///     .with_beacon_stop_delay(Duration::ZERO);
    /// ```
    pub fn with_beacon_stop_delay(mut self, delay: Duration) -> Self {
        self.beacon_stop_delay = delay;
        self
    }

    /// Set the number of hash buckets, clamped to `1..=32`.
    pub fn with_hash_buckets(mut self, buckets: u32) -> Self {
        self.hash_buckets = buckets.clamp(1, DEFAULT_HASH_BUCKETS);
        self
    }

    pub fn with_record_ttl(mut self, ttl: u32) -> Self {
        self.record_ttl = ttl;
        self
    }

    pub fn with_carrier_capacity(mut self, capacity: usize) -> Self {
        self.carrier_capacity = capacity;
        self
    }
}
