//! Resource records and their typed RDATA bodies.

pub(crate) mod a;
pub(crate) mod aaaa;
pub(crate) mod cname;
pub(crate) mod ptr;
pub(crate) mod srv;
pub(crate) mod txt;

use std::collections::HashMap;
use std::fmt;

use a::AResource;
use aaaa::AaaaResource;
use cname::CnameResource;
use ptr::PtrResource;
use srv::SrvResource;
use txt::TxtResource;

use super::name::Name;
use super::packer::*;
use super::{DnsClass, DnsType};
use shared::error::{Error, Result};

/// Name to offset map shared by every name packed into one buffer.
pub(crate) type Compression = Option<HashMap<String, usize>>;

/// A resource record: header plus decoded RDATA.
#[derive(Default, Debug)]
pub(crate) struct Resource {
    pub(crate) header: ResourceHeader,
    pub(crate) body: Option<Box<dyn ResourceBody>>,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Some(body) => write!(f, "{} {body}", self.header),
            None => write!(f, "{} <no rdata>", self.header),
        }
    }
}

impl Resource {
    /// Appends the record to `msg`, filling in the header's type and
    /// RDLENGTH from the body.
    pub(crate) fn pack(
        &mut self,
        msg: Vec<u8>,
        compression: &mut Compression,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        let body = self.body.as_ref().ok_or(Error::ErrNilResourceBody)?;
        self.header.typ = body.real_type();

        let (mut msg, len_off) = self.header.pack(msg, compression, compression_off)?;
        let body_start = msg.len();
        msg = body.pack(msg, compression, compression_off)?;

        let length =
            u16::try_from(msg.len() - body_start).map_err(|_| Error::ErrResTooLong)?;
        msg[len_off..len_off + 2].copy_from_slice(&length.to_be_bytes());
        self.header.length = length;
        Ok(msg)
    }

    /// Reads a whole record starting at `off`. Names may point anywhere
    /// earlier in `msg`.
    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let off = self.header.unpack(msg, off)?;
        let (body, end) =
            unpack_resource_body(self.header.typ, msg, off, self.header.length as usize)?;
        self.body = Some(body);
        Ok(end)
    }

    /// The body packed without compression. Two records with the same data
    /// always produce the same bytes here, wherever they were read from.
    pub(crate) fn rdata(&self) -> Result<Vec<u8>> {
        let body = self.body.as_ref().ok_or(Error::ErrNilResourceBody)?;
        body.pack(vec![], &mut None, 0)
    }
}

/// NAME, TYPE, CLASS, TTL and RDLENGTH of a record.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub(crate) struct ResourceHeader {
    pub(crate) name: Name,
    /// Set from the body when packing.
    pub(crate) typ: DnsType,
    pub(crate) class: DnsClass,
    pub(crate) ttl: u32,
    /// Set from the body when packing.
    pub(crate) length: u16,
}

impl fmt::Display for ResourceHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.name, self.ttl, self.class, self.typ)
    }
}

impl ResourceHeader {
    /// Appends the header and returns the buffer with the offset of the
    /// RDLENGTH field, which the caller patches once the body is known.
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        compression: &mut Compression,
        compression_off: usize,
    ) -> Result<(Vec<u8>, usize)> {
        msg = self.name.pack(msg, compression, compression_off)?;
        msg = self.typ.pack(msg);
        msg = self.class.pack(msg);
        msg = pack_uint32(msg, self.ttl);
        let len_off = msg.len();
        msg = pack_uint16(msg, self.length);
        Ok((msg, len_off))
    }

    /// Reads a header, rejecting record types without a body decoder.
    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let off = self.name.unpack(msg, off)?;
        let (raw, off) = unpack_uint16(msg, off)?;
        self.typ = DnsType::from(raw);
        if self.typ == DnsType::Unsupported {
            return Err(Error::ErrUnsupportedResourceType(raw));
        }
        let off = self.class.unpack(msg, off)?;
        let (ttl, off) = unpack_uint32(msg, off)?;
        let (length, off) = unpack_uint16(msg, off)?;
        self.ttl = ttl;
        self.length = length;
        Ok(off)
    }
}

/// Typed RDATA.
pub(crate) trait ResourceBody: fmt::Display + fmt::Debug + Send {
    /// The record type this body belongs to.
    fn real_type(&self) -> DnsType;

    fn pack(
        &self,
        msg: Vec<u8>,
        compression: &mut Compression,
        compression_off: usize,
    ) -> Result<Vec<u8>>;

    /// Reads the body at `off`. `length` is the declared RDLENGTH.
    fn unpack(&mut self, msg: &[u8], off: usize, length: usize) -> Result<usize>;
}

/// Decodes RDATA of type `typ` spanning exactly `length` bytes at `off`.
///
/// Names inside the body may point anywhere in `msg`, but the body itself
/// must end exactly at its declared length. Types without a decoder are
/// rejected with [`Error::ErrUnsupportedResourceType`].
pub(crate) fn unpack_resource_body(
    typ: DnsType,
    msg: &[u8],
    off: usize,
    length: usize,
) -> Result<(Box<dyn ResourceBody>, usize)> {
    let end = off + length;
    if end > msg.len() {
        return Err(Error::ErrResourceLen);
    }

    let mut body: Box<dyn ResourceBody> = match typ {
        DnsType::A => Box::<AResource>::default(),
        DnsType::Cname => Box::<CnameResource>::default(),
        DnsType::Ptr => Box::<PtrResource>::default(),
        DnsType::Txt => Box::<TxtResource>::default(),
        DnsType::Aaaa => Box::<AaaaResource>::default(),
        DnsType::Srv => Box::<SrvResource>::default(),
        DnsType::Unsupported => return Err(Error::ErrUnsupportedResourceType(typ as u16)),
    };

    if body.unpack(msg, off, length)? != end {
        return Err(Error::ErrResourceLen);
    }
    Ok((body, end))
}
