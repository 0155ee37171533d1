//! Resource records exchanged with external transport plugins.
//!
//! Plugins speak in opaque (key, value) byte pairs. A key is a record name in
//! DNS wire form, compressed against a small fixed suffix table, followed by
//! the record type and a format version byte. A value is the record's RDATA
//! compressed against the same table and the key's name.
//!
//! The suffix table is laid out like the start of a DNS message:
//!
//! ```text
//! offset  0: 12 byte zero header
//! offset 12: \x04_tcp\x05local\x00
//! offset 24: \x04_udp\xc0\x11        (points at "local")
//! offset 31: key name ...
//! ```
//!
//! Decoding appends the key and value to a copy of this table so that the
//! regular resource record reader can resolve every pointer.

pub(crate) mod synth;
pub(crate) mod table;

#[cfg(test)]
mod record_test;

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;

use crate::message::name::Name;
use crate::message::resource::ptr::PtrResource;
use crate::message::resource::srv::SrvResource;
use crate::message::resource::txt::TxtResource;
use crate::message::resource::{Resource, ResourceBody, ResourceHeader, unpack_resource_body};
use crate::message::{DNSCLASS_INET, DnsClass, DnsType};
use shared::error::{Error, Result};

/// Format version understood in the last byte of a plugin key.
pub const KEY_FORMAT_VERSION: u8 = 1;

/// Fixed compression targets that plugin keys and values may point into.
pub(crate) const CARRIER_SUFFIXES: &[u8] =
    b"\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x04_tcp\x05local\x00\x04_udp\xc0\x11";

/// Offset at which a key's name starts inside a carrier message.
pub const CARRIER_KEY_OFFSET: usize = 31;

/// Instance label of the presence-only record injected for beacon matches.
pub const PLACEHOLDER_INSTANCE: &str = "ThresholdInstance";

// class + ttl + rdlength written in place of the key's version byte.
pub(crate) const CARRIER_FIXED_FIELDS: usize = 8;

fn suffix_compression() -> HashMap<String, usize> {
    HashMap::from([
        ("_tcp.local.".to_owned(), 12),
        ("local.".to_owned(), 17),
        ("_udp.local.".to_owned(), 24),
    ])
}

/// Appends a trailing dot when `name` lacks one.
pub(crate) fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_owned()
    } else {
        format!("{name}.")
    }
}

/// An owned DNS resource record with uncompressed RDATA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Owner name with trailing dot.
    pub name: String,
    pub rr_type: DnsType,
    pub class: DnsClass,
    pub ttl: u32,
    /// RDATA in canonical uncompressed wire form.
    pub rdata: Bytes,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} ({} bytes)",
            self.name,
            self.ttl,
            self.class,
            self.rr_type,
            self.rdata.len()
        )
    }
}

impl Record {
    fn from_body(name: &str, ttl: u32, body: &dyn ResourceBody) -> Result<Self> {
        let name = Name::new(&fqdn(name))?;
        let rdata = body.pack(vec![], &mut None, 0)?;
        Ok(Record {
            name: name.data,
            rr_type: body.real_type(),
            class: DNSCLASS_INET,
            ttl,
            rdata: Bytes::from(rdata),
        })
    }

    /// A PTR record pointing `name` at `target`.
    pub fn ptr(name: &str, target: &str, ttl: u32) -> Result<Self> {
        let body = PtrResource {
            ptr: Name::new(&fqdn(target))?,
        };
        Self::from_body(name, ttl, &body)
    }

    /// An SRV record for `name` with zero priority and weight.
    pub fn srv(name: &str, port: u16, target: &str, ttl: u32) -> Result<Self> {
        let body = SrvResource {
            priority: 0,
            weight: 0,
            port,
            target: Name::new(&fqdn(target))?,
        };
        Self::from_body(name, ttl, &body)
    }

    /// A TXT record holding the given character strings.
    pub fn txt<S: AsRef<[u8]>>(
        name: &str,
        txt: impl IntoIterator<Item = S>,
        ttl: u32,
    ) -> Result<Self> {
        let body = TxtResource {
            txt: txt.into_iter().map(|s| s.as_ref().to_vec()).collect(),
        };
        Self::from_body(name, ttl, &body)
    }

    /// Copies a decoded resource into an owned record.
    pub(crate) fn from_resource(resource: &Resource) -> Result<Self> {
        Ok(Record {
            name: resource.header.name.data.clone(),
            rr_type: resource.header.typ,
            class: resource.header.class,
            ttl: resource.header.ttl,
            rdata: Bytes::from(resource.rdata()?),
        })
    }

    /// Reports whether both records describe the same DNS data: the same
    /// name ignoring ASCII case, the same type and identical RDATA. TTL and
    /// class are not part of the identity.
    pub fn same_record(&self, other: &Record) -> bool {
        self.rr_type == other.rr_type
            && self.name.eq_ignore_ascii_case(&other.name)
            && self.rdata == other.rdata
    }

    /// Reports whether the record is the presence-only placeholder.
    pub fn is_placeholder(&self) -> bool {
        if self.rr_type != DnsType::Ptr {
            return false;
        }
        let mut target = Name::default();
        target.unpack(&self.rdata, 0).is_ok()
            && target
                .data
                .split('.')
                .next()
                .is_some_and(|label| label == PLACEHOLDER_INSTANCE)
    }
}

/// Encodes the plugin key for records of `rr_type` named `name`.
pub fn encode_key(name: &str, rr_type: DnsType) -> Result<Bytes> {
    let name = Name::new(&fqdn(name))?;
    let mut compression = Some(suffix_compression());
    let mut msg = name.pack(CARRIER_SUFFIXES.to_vec(), &mut compression, 0)?;
    msg = rr_type.pack(msg);
    msg.push(KEY_FORMAT_VERSION);
    Ok(Bytes::copy_from_slice(&msg[CARRIER_KEY_OFFSET..]))
}

/// Encodes a record into the (key, value) pair handed to plugins.
///
/// The record is packed at the key offset exactly as a carrier lays it out,
/// so pointers in the value resolve to the same names when decoded.
pub fn encode_record(record: &Record) -> Result<(Bytes, Bytes)> {
    let (body, _) = unpack_resource_body(record.rr_type, &record.rdata, 0, record.rdata.len())?;
    let mut resource = Resource {
        header: ResourceHeader {
            name: Name::new(&fqdn(&record.name))?,
            typ: record.rr_type,
            class: record.class,
            ttl: record.ttl,
            length: 0,
        },
        body: Some(body),
    };

    let mut compression = Some(suffix_compression());
    let msg = resource.pack(CARRIER_SUFFIXES.to_vec(), &mut compression, 0)?;

    let name_end = Name::skip(&msg, CARRIER_KEY_OFFSET)?;
    let type_end = name_end + 2;
    let value_start = type_end + CARRIER_FIXED_FIELDS;
    if msg.len() < value_start {
        return Err(Error::ErrResourceLen);
    }

    let mut key = Vec::with_capacity(type_end - CARRIER_KEY_OFFSET + 1);
    key.extend_from_slice(&msg[CARRIER_KEY_OFFSET..type_end]);
    key.push(KEY_FORMAT_VERSION);

    Ok((Bytes::from(key), Bytes::copy_from_slice(&msg[value_start..])))
}

/// The value of the presence-only PTR record injected under a browse key:
/// a single instance label followed by a pointer to the key's name.
pub fn placeholder_value() -> Bytes {
    let mut value = Vec::with_capacity(PLACEHOLDER_INSTANCE.len() + 3);
    value.push(PLACEHOLDER_INSTANCE.len() as u8);
    value.extend_from_slice(PLACEHOLDER_INSTANCE.as_bytes());
    value.push(0xC0 | (CARRIER_KEY_OFFSET >> 8) as u8);
    value.push((CARRIER_KEY_OFFSET & 0xFF) as u8);
    Bytes::from(value)
}
