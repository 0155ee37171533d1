//! Reference counted registry of local browse and advertise requests.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::Bytes;

use crate::hash::{ServiceMask, service_hash};
use crate::record::{Record, fqdn};
use crate::transport::{InterfaceId, RecordScope, ServiceFlags, Transport};
use shared::error::{Error, Result};

/// Handle of a query owned by the surrounding query engine.
pub type QueryHandle = u64;

/// Handle of a service registration owned by the surrounding engine.
pub type RegistrationHandle = u64;

/// Which half of the beacon a request contributes to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Browse,
    Advertise,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Browse => write!(f, "browse"),
            Category::Advertise => write!(f, "advertise"),
        }
    }
}

/// A service type and the category it is requested in.
///
/// Names compare ASCII case-insensitively, as DNS names do.
#[derive(Debug, Clone)]
pub struct ServiceKey {
    name: String,
    category: Category,
}

impl ServiceKey {
    pub fn new(name: &str, category: Category) -> Self {
        Self {
            name: fqdn(name),
            category,
        }
    }

    pub fn browse(service_type: &str) -> Self {
        Self::new(service_type, Category::Browse)
    }

    pub fn advertise(service_type: &str) -> Self {
        Self::new(service_type, Category::Advertise)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.category == other.category && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.category.hash(state);
        for b in self.name.bytes() {
            b.to_ascii_lowercase().hash(state);
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.category, self.name)
    }
}

/// Stable identifier of a [`LocalRequest`]. Identifiers are never reused, so
/// a stale one simply no longer resolves.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The client object behind a request and its current transport attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOwner {
    Query {
        handle: QueryHandle,
        flags: ServiceFlags,
    },
    Registration {
        handle: RegistrationHandle,
        flags: ServiceFlags,
        scope: RecordScope,
        /// The PTR, SRV and TXT records of the registration.
        records: Vec<Record>,
    },
}

impl RequestOwner {
    pub fn flags(&self) -> ServiceFlags {
        match self {
            RequestOwner::Query { flags, .. } | RequestOwner::Registration { flags, .. } => *flags,
        }
    }
}

/// Owner attributes saved before a promotion, restored on demotion.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SavedAttributes {
    Flags(ServiceFlags),
    Scope(RecordScope),
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Promotion {
    #[default]
    None,
    Promoted {
        transport: Transport,
        saved: SavedAttributes,
    },
}

/// Everything needed to create a request on its first acquisition.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub key: ServiceKey,
    pub owner: RequestOwner,
    pub interface: InterfaceId,
    /// Plugin key for the service type, used for placeholder injection.
    pub beacon_key: Bytes,
}

/// A browse or advertise request that takes part in beacon matching.
#[derive(Debug, Clone)]
pub struct LocalRequest {
    pub id: RequestId,
    pub key: ServiceKey,
    pub refcount: usize,
    pub mask: ServiceMask,
    pub owner: RequestOwner,
    pub interface: InterfaceId,
    pub beacon_key: Bytes,
    /// Number of peers whose current beacon matches this request.
    pub match_count: usize,
    pub promotion: Promotion,
}

/// Outcome of [`RequestRegistry::acquire`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Acquired {
    pub id: RequestId,
    /// The request was created by this call.
    pub first: bool,
}

/// Outcome of [`RequestRegistry::release`].
#[derive(Debug)]
pub enum Released {
    /// Other references remain.
    Remaining { id: RequestId, refcount: usize },
    /// The last reference was dropped; the request is handed back so the
    /// caller can undo its side effects.
    Last(LocalRequest),
}

/// Active local requests keyed by (name, category).
#[derive(Debug)]
pub struct RequestRegistry {
    buckets: u32,
    next_id: u64,
    index: HashMap<ServiceKey, RequestId>,
    // Ids grow monotonically, so iteration order is insertion order.
    requests: BTreeMap<RequestId, LocalRequest>,
}

impl RequestRegistry {
    pub fn new(buckets: u32) -> Self {
        Self {
            buckets,
            next_id: 1,
            index: HashMap::new(),
            requests: BTreeMap::new(),
        }
    }

    /// Takes a reference on the request for `spec.key`, creating it if needed.
    ///
    /// # Errors
    ///
    /// [`Error::ErrHashUnrepresentable`] when the service type cannot be put
    /// on the beacon. Nothing is recorded in that case.
    pub fn acquire(&mut self, spec: RequestSpec) -> Result<Acquired> {
        if let Some(id) = self.index.get(&spec.key).copied()
            && let Some(request) = self.requests.get_mut(&id)
        {
            request.refcount += 1;
            log::debug!(
                "{} {id}: duplicate of existing request, refcount {}",
                request.key,
                request.refcount
            );
            return Ok(Acquired { id, first: false });
        }

        let mask = service_hash(spec.key.name(), self.buckets);
        if mask.is_empty() {
            return Err(Error::ErrHashUnrepresentable(spec.key.name().to_owned()));
        }

        let id = RequestId(self.next_id);
        self.next_id += 1;
        log::debug!("{} {id}: new request with mask {mask}", spec.key);

        self.index.insert(spec.key.clone(), id);
        self.requests.insert(
            id,
            LocalRequest {
                id,
                key: spec.key,
                refcount: 1,
                mask,
                owner: spec.owner,
                interface: spec.interface,
                beacon_key: spec.beacon_key,
                match_count: 0,
                promotion: Promotion::None,
            },
        );
        Ok(Acquired { id, first: true })
    }

    /// Drops a reference on the request for `key`. Returns `None` when no
    /// such request exists.
    pub fn release(&mut self, key: &ServiceKey) -> Option<Released> {
        let Some(id) = self.index.get(key).copied() else {
            log::debug!("{key}: no matching request to release");
            return None;
        };
        let request = self.requests.get_mut(&id)?;
        request.refcount = request.refcount.saturating_sub(1);
        if request.refcount > 0 {
            log::debug!("{key} {id}: released, refcount {}", request.refcount);
            return Some(Released::Remaining {
                id,
                refcount: request.refcount,
            });
        }

        self.index.remove(key);
        let request = self.requests.remove(&id)?;
        log::debug!("{key} {id}: last reference released");
        Some(Released::Last(request))
    }

    pub fn get(&self, id: RequestId) -> Option<&LocalRequest> {
        self.requests.get(&id)
    }

    pub fn get_mut(&mut self, id: RequestId) -> Option<&mut LocalRequest> {
        self.requests.get_mut(&id)
    }

    pub fn find(&self, key: &ServiceKey) -> Option<&LocalRequest> {
        self.index.get(key).and_then(|id| self.requests.get(id))
    }

    /// Requests of one category in the order they were created.
    pub fn iter(&self, category: Category) -> impl Iterator<Item = &LocalRequest> {
        self.requests
            .values()
            .filter(move |r| r.key.category == category)
    }

    /// OR of the masks of every request in `category`.
    pub fn combined_mask(&self, category: Category) -> ServiceMask {
        self.iter(category)
            .fold(ServiceMask::EMPTY, |acc, r| acc | r.mask)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.requests.clear();
    }
}
