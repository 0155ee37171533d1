use shared::error::{Error, Result};

use super::*;
use crate::message::name::NameEnd;
use crate::message::packer::{pack_uint16, pack_uint32};

/// Turns plugin (key, value) pairs into resource records by running them
/// through the regular record reader inside a small carrier message.
#[derive(Debug, Clone)]
pub struct RecordSynthesizer {
    ttl: u32,
    capacity: usize,
}

impl RecordSynthesizer {
    /// Creates a synthesizer that stamps `ttl` on every record and refuses
    /// carriers larger than `capacity` bytes.
    pub fn new(ttl: u32, capacity: usize) -> Self {
        Self { ttl, capacity }
    }

    /// Decodes a plugin key and value into a record.
    ///
    /// # Errors
    ///
    /// * [`Error::ErrKeyMalformed`] or [`Error::ErrUnsupportedKeyVersion`]
    ///   when the key is not a name, type and version byte.
    /// * [`Error::ErrCapacityExceeded`] when the carrier would not fit.
    /// * Any codec error raised while reading the record.
    pub fn synthesize(&self, key: &[u8], value: &[u8]) -> Result<Record> {
        let name_end = validate_key(key)?;

        let needed = CARRIER_KEY_OFFSET + name_end + 2 + CARRIER_FIXED_FIELDS + value.len();
        if needed > self.capacity {
            return Err(Error::ErrCapacityExceeded {
                needed,
                capacity: self.capacity,
            });
        }
        let rdlength = u16::try_from(value.len()).map_err(|_| Error::ErrResTooLong)?;

        let mut carrier = Vec::with_capacity(needed);
        carrier.extend_from_slice(CARRIER_SUFFIXES);
        // Name and type; the version byte is replaced by the fixed fields.
        carrier.extend_from_slice(&key[..key.len() - 1]);
        carrier = pack_uint16(carrier, DNSCLASS_INET.0);
        carrier = pack_uint32(carrier, self.ttl);
        carrier = pack_uint16(carrier, rdlength);
        carrier.extend_from_slice(value);

        let mut resource = Resource::default();
        let end = resource.unpack(&carrier, CARRIER_KEY_OFFSET)?;
        if end != carrier.len() {
            return Err(Error::ErrResourceLen);
        }

        Record::from_resource(&resource)
    }
}

/// Checks the shape of a plugin key and returns the length of its name.
///
/// The name may end in a pointer into the suffix table, which is reported but
/// never followed: the key arrives without the table in front of it.
fn validate_key(key: &[u8]) -> Result<usize> {
    let mut name = Name::default();
    let (name_end, end) = name
        .unpack_prefix(key, 0)
        .map_err(|err| Error::ErrKeyMalformed(format!("bad name: {err}")))?;

    if let NameEnd::Pointer(target) = end
        && target >= CARRIER_KEY_OFFSET
    {
        return Err(Error::ErrKeyMalformed(format!(
            "name pointer {target:#x} outside suffix table"
        )));
    }

    // Two type bytes and the version tag must follow the name exactly.
    if key.len() != name_end + 3 {
        return Err(Error::ErrKeyMalformed(format!(
            "{} bytes after name, expected 3",
            key.len().saturating_sub(name_end)
        )));
    }

    let version = key[name_end + 2];
    if version != KEY_FORMAT_VERSION {
        return Err(Error::ErrUnsupportedKeyVersion(version));
    }

    Ok(name_end)
}
