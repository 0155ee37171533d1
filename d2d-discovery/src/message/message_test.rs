use std::collections::HashMap;

use super::name::*;
use super::resource::{a::*, ptr::*, srv::*, txt::*, *};
use super::*;
use shared::error::*;

fn must_new_name(name: &str) -> Name {
    Name::new(name).expect("valid name")
}

fn loopback_record() -> Resource {
    Resource {
        header: ResourceHeader {
            name: must_new_name("host.local."),
            class: DNSCLASS_INET,
            ttl: 120,
            ..Default::default()
        },
        body: Some(Box::new(AResource { a: [127, 0, 0, 1] })),
    }
}

#[test]
fn test_name_string() -> Result<()> {
    let want = "foo._tcp.local.";
    let name = Name::new(want)?;
    assert_eq!(name.to_string(), want);
    Ok(())
}

#[test]
fn test_name_too_long() {
    let long = "a".repeat(256);
    assert_eq!(Name::new(&long), Err(Error::ErrCalcLen));
}

#[test]
fn test_name_pack_non_canonical() {
    let name = must_new_name("foo._tcp.local");
    assert_eq!(
        name.pack(vec![], &mut None, 0),
        Err(Error::ErrNonCanonicalName)
    );
}

#[test]
fn test_name_pack_zero_segment() {
    let name = must_new_name("foo.._tcp.local.");
    assert_eq!(name.pack(vec![], &mut None, 0), Err(Error::ErrZeroSegLen));
}

#[test]
fn test_name_pack_compression() -> Result<()> {
    let mut compression = Some(HashMap::new());
    let first = must_new_name("_ipp._tcp.local.");
    let second = must_new_name("printer._ipp._tcp.local.");

    let msg = first.pack(vec![], &mut compression, 0)?;
    assert_eq!(msg.len(), 17);
    let msg = second.pack(msg, &mut compression, 0)?;
    // "printer" literal label followed by a pointer back to offset 0.
    assert_eq!(&msg[17..], b"\x07printer\xc0\x00");

    let mut got = Name::default();
    let off = got.unpack(&msg, 17)?;
    assert_eq!(off, msg.len());
    assert_eq!(got, second);
    Ok(())
}

#[test]
fn test_name_unpack_pointer_loop() {
    // Two pointers referring to each other.
    let msg = [0xc0u8, 0x02, 0xc0, 0x00];
    let mut name = Name::default();
    assert_eq!(name.unpack(&msg, 0), Err(Error::ErrTooManyPtr));
}

#[test]
fn test_name_unpack_reserved_prefix() {
    let msg = [0x40u8, 0x00];
    let mut name = Name::default();
    assert_eq!(name.unpack(&msg, 0), Err(Error::ErrReserved));
}

#[test]
fn test_name_unpack_truncated_label() {
    let msg = b"\x05ab";
    let mut name = Name::default();
    assert_eq!(name.unpack(msg, 0), Err(Error::ErrCalcLen));
}

#[test]
fn test_name_unpack_prefix_stops_at_pointer() -> Result<()> {
    // The pointer target lies outside the fragment and must not be followed.
    let fragment = b"\x03foo\xc0\x40\x00\x10";
    let mut name = Name::default();
    let (off, end) = name.unpack_prefix(fragment, 0)?;
    assert_eq!(name.data, "foo.");
    assert_eq!(off, 6);
    assert_eq!(end, NameEnd::Pointer(0x40));
    Ok(())
}

#[test]
fn test_name_unpack_prefix_root() -> Result<()> {
    let fragment = b"\x03foo\x00";
    let mut name = Name::default();
    let (off, end) = name.unpack_prefix(fragment, 0)?;
    assert_eq!(name.data, "foo.");
    assert_eq!(off, fragment.len());
    assert_eq!(end, NameEnd::Root);
    Ok(())
}

#[test]
fn test_name_same_domain_ignores_case() {
    let a = must_new_name("Foo._TCP.local.");
    let b = must_new_name("foo._tcp.LOCAL.");
    let c = must_new_name("bar._tcp.local.");
    assert!(a.same_domain(&b));
    assert!(!a.same_domain(&c));
}

#[test]
fn test_name_skip() -> Result<()> {
    let msg = b"\x03foo\xc0\x0c";
    assert_eq!(Name::skip(msg, 0)?, msg.len());
    assert_eq!(Name::skip(b"\x03fo", 0), Err(Error::ErrCalcLen));
    Ok(())
}

#[test]
fn test_dns_type_string() {
    assert_eq!(DnsType::Ptr.to_string(), "PTR");
    assert_eq!(DnsType::Srv.to_string(), "SRV");
    assert_eq!(DnsType::from(16), DnsType::Txt);
    assert_eq!(DnsType::from(4242), DnsType::Unsupported);
}

#[test]
fn test_dns_class_string() {
    assert_eq!(DNSCLASS_INET.to_string(), "IN");
    assert_eq!(DnsClass(42).to_string(), "CLASS42");
}

#[test]
fn test_resource_pack_unpack() -> Result<()> {
    let mut res = loopback_record();
    let buf = res.pack(vec![], &mut None, 0)?;
    assert_eq!(res.header.typ, DnsType::A);
    assert_eq!(res.header.length, 4);

    let mut got = Resource::default();
    assert_eq!(got.unpack(&buf, 0)?, buf.len());
    assert_eq!(got.header, res.header);
    assert_eq!(got.to_string(), "host.local. 120 IN A 127.0.0.1");
    Ok(())
}

#[test]
fn test_resource_pack_compresses_owner_name() -> Result<()> {
    let mut compression = Some(HashMap::new());
    let first = loopback_record().pack(vec![], &mut compression, 0)?;
    let both = loopback_record().pack(first.clone(), &mut compression, 0)?;
    // The second owner name is a two byte pointer to the first.
    assert_eq!(both.len() - first.len(), 2 + 10 + 4);
    assert_eq!(&both[first.len()..first.len() + 2], b"\xc0\x00");
    Ok(())
}

#[test]
fn test_resource_pack_without_body() {
    let mut res = Resource::default();
    assert_eq!(
        res.pack(vec![], &mut None, 0).err(),
        Some(Error::ErrNilResourceBody)
    );
}

#[test]
fn test_txt_resource_unpack() -> Result<()> {
    let rdata = b"\x05txtvers=1\x05rp=ab";
    // A short first length misaligns every string after it.
    let mut txt = TxtResource::default();
    assert!(txt.unpack(rdata, 0, rdata.len()).is_err());

    let rdata = b"\x09txtvers=1\x05rp=ab";
    let off = txt.unpack(rdata, 0, rdata.len())?;
    assert_eq!(off, rdata.len());
    assert_eq!(txt.txt, vec![b"txtvers=1".to_vec(), b"rp=ab".to_vec()]);
    Ok(())
}

#[test]
fn test_txt_resource_keeps_binary_values() -> Result<()> {
    let rdata = b"\x06key=\xff\x00\x09txtvers=1";
    let mut txt = TxtResource::default();
    assert_eq!(txt.unpack(rdata, 0, rdata.len())?, rdata.len());
    assert_eq!(txt.txt[0], b"key=\xff\x00".to_vec());
    assert_eq!(txt.pack(vec![], &mut None, 0)?, rdata.to_vec());
    Ok(())
}

#[test]
fn test_srv_unpack_follows_compression() -> Result<()> {
    let mut msg = b"\x04host\x05local\x00".to_vec();
    let body_off = msg.len();
    msg.extend_from_slice(&[0, 0, 0, 0, 0x02, 0x77, 0xc0, 0x00]);

    let (rb, end) = unpack_resource_body(DnsType::Srv, &msg, body_off, 8)?;
    assert_eq!(end, msg.len());
    assert_eq!(rb.real_type(), DnsType::Srv);
    assert_eq!(rb.to_string(), "0 0 631 host.local.");
    Ok(())
}

#[test]
fn test_srv_pack_is_uncompressed() -> Result<()> {
    let srv = SrvResource {
        priority: 0,
        weight: 0,
        port: 631,
        target: must_new_name("host.local."),
    };
    let mut compression = Some(HashMap::from([("host.local.".to_owned(), 0usize)]));
    let packed = srv.pack(vec![], &mut compression, 0)?;
    assert_eq!(&packed[6..], b"\x04host\x05local\x00");
    Ok(())
}

#[test]
fn test_resource_body_length_mismatch() {
    // PTR body declares 8 bytes but the name only spans 6.
    let msg = b"\x04host\x00\x00\x00";
    let res = unpack_resource_body(DnsType::Ptr, msg, 0, 8);
    assert_eq!(res.err(), Some(Error::ErrResourceLen));
}

#[test]
fn test_resource_unknown_type() {
    // host.local. MX IN ttl 120, four bytes of RDATA.
    let mut msg = b"\x04host\x05local\x00\x00\x0f\x00\x01\x00\x00\x00\x78\x00\x04".to_vec();
    msg.extend_from_slice(&[0, 10, 0xc0, 0]);
    let mut res = Resource::default();
    assert_eq!(
        res.unpack(&msg, 0).err(),
        Some(Error::ErrUnsupportedResourceType(15))
    );
}

#[test]
fn test_resource_rdata_is_canonical() -> Result<()> {
    let res = Resource {
        header: ResourceHeader {
            name: must_new_name("_ipp._tcp.local."),
            typ: DnsType::Ptr,
            class: DNSCLASS_INET,
            ttl: 120,
            length: 0,
        },
        body: Some(Box::new(PtrResource {
            ptr: must_new_name("printer._ipp._tcp.local."),
        })),
    };
    assert_eq!(res.rdata()?, b"\x07printer\x04_ipp\x04_tcp\x05local\x00".to_vec());
    Ok(())
}
