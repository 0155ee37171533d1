use super::synth::*;
use super::table::*;
use super::*;
use crate::transport::Transport;

const TTL: u32 = 120;

fn synthesizer() -> RecordSynthesizer {
    RecordSynthesizer::new(TTL, 512)
}

#[test]
fn test_carrier_suffix_layout() {
    assert_eq!(CARRIER_SUFFIXES.len(), CARRIER_KEY_OFFSET);
    let mut name = Name::default();
    name.unpack(CARRIER_SUFFIXES, 12).expect("tcp suffix");
    assert_eq!(name.data, "_tcp.local.");
    name.unpack(CARRIER_SUFFIXES, 24).expect("udp suffix");
    assert_eq!(name.data, "_udp.local.");
}

#[test]
fn test_encode_key_compresses_against_suffix_table() -> Result<()> {
    let key = encode_key("_ipp._tcp.local", DnsType::Ptr)?;
    assert_eq!(&key[..], b"\x04_ipp\xc0\x0c\x00\x0c\x01");

    let key = encode_key("_airplay._udp.local.", DnsType::Txt)?;
    assert_eq!(&key[..], b"\x08_airplay\xc0\x18\x00\x10\x01");
    Ok(())
}

#[test]
fn test_encode_record_value_points_at_key() -> Result<()> {
    let record = Record::ptr("_ipp._tcp.local.", "printer._ipp._tcp.local.", TTL)?;
    let (key, value) = encode_record(&record)?;
    assert_eq!(key, encode_key("_ipp._tcp.local.", DnsType::Ptr)?);
    assert_eq!(&value[..], b"\x07printer\xc0\x1f");

    let got = synthesizer().synthesize(&key, &value)?;
    assert_eq!(got, record);
    Ok(())
}

#[test]
fn test_synthesize_txt_matches_wire_record() -> Result<()> {
    let key = b"\x03foo\xc0\x0c\x00\x10\x01";
    let value = b"\x09txtvers=1\x05rp=ab";
    let synthesized = synthesizer().synthesize(key, value)?;

    let mut answer = Resource {
        header: ResourceHeader {
            name: Name::new("foo._tcp.local.")?,
            typ: DnsType::Txt,
            class: DNSCLASS_INET,
            ttl: TTL,
            length: 0,
        },
        body: Some(Box::new(TxtResource {
            txt: vec![b"txtvers=1".to_vec(), b"rp=ab".to_vec()],
        })),
    };
    let packet = answer.pack(vec![], &mut None, 0)?;
    let mut parsed = Resource::default();
    parsed.unpack(&packet, 0)?;
    let from_wire = Record::from_resource(&parsed)?;

    assert_eq!(synthesized, from_wire);
    assert_eq!(&synthesized.rdata[..], &value[..]);
    Ok(())
}

#[test]
fn test_synthesize_txt_with_binary_value() -> Result<()> {
    let key = b"\x03foo\xc0\x0c\x00\x10\x01";
    let value = b"\x07flags=\x80\x09txtvers=1";
    let record = synthesizer().synthesize(key, value)?;
    assert_eq!(record.rr_type, DnsType::Txt);
    assert_eq!(&record.rdata[..], &value[..]);

    let built = Record::txt("foo._tcp.local.", [&b"flags=\x80"[..], b"txtvers=1"], TTL)?;
    assert!(built.same_record(&record));
    Ok(())
}

#[test]
fn test_synthesize_srv() -> Result<()> {
    let record = Record::srv("printer._ipp._tcp.local.", 631, "host.local.", TTL)?;
    let (key, value) = encode_record(&record)?;
    let got = synthesizer().synthesize(&key, &value)?;
    assert!(got.same_record(&record));
    assert_eq!(got.rr_type, DnsType::Srv);
    Ok(())
}

#[test]
fn test_synthesize_rejects_bad_version() {
    let key = b"\x03foo\xc0\x0c\x00\x10\x02";
    assert_eq!(
        synthesizer().synthesize(key, b"\x00"),
        Err(Error::ErrUnsupportedKeyVersion(2))
    );
}

#[test]
fn test_synthesize_rejects_malformed_keys() {
    let synth = synthesizer();
    let bad_keys: [&[u8]; 5] = [
        b"",
        // Missing version byte.
        b"\x03foo\xc0\x0c\x00\x10",
        // Trailing garbage.
        b"\x03foo\xc0\x0c\x00\x10\x01\x01",
        // Pointer beyond the suffix table.
        b"\x03foo\xc0\x40\x00\x10\x01",
        // Label runs past the key.
        b"\x09foo",
    ];
    for key in bad_keys {
        let err = synth.synthesize(key, b"\x00").expect_err("malformed key");
        assert!(
            matches!(err, Error::ErrKeyMalformed(_)),
            "unexpected error {err} for key {key:?}"
        );
        assert!(err.is_parse_error());
    }
}

#[test]
fn test_synthesize_rejects_garbled_value() {
    // TXT string claims more bytes than the value holds.
    let key = b"\x03foo\xc0\x0c\x00\x10\x01";
    let err = synthesizer()
        .synthesize(key, b"\x20abc")
        .expect_err("garbled value");
    assert!(err.is_parse_error());

    // Value pointer leads past the end of the carrier.
    let key = b"\x04_ipp\xc0\x0c\x00\x0c\x01";
    let err = synthesizer()
        .synthesize(key, b"\x07printer\xc0\xff")
        .expect_err("dangling pointer");
    assert!(err.is_parse_error());
}

#[test]
fn test_synthesize_capacity_exceeded() {
    let key = b"\x03foo\xc0\x0c\x00\x10\x01";
    let mut value = vec![];
    for _ in 0..4 {
        value.push(120u8);
        value.extend(std::iter::repeat_n(b'a', 120));
    }
    assert_eq!(
        synthesizer().synthesize(key, &value),
        Err(Error::ErrCapacityExceeded {
            needed: CARRIER_KEY_OFFSET + 8 + 8 + value.len(),
            capacity: 512,
        })
    );

    // The same value fits a larger carrier.
    let roomy = RecordSynthesizer::new(TTL, 1024);
    assert!(roomy.synthesize(key, &value).is_ok());
}

#[test]
fn test_placeholder_record() -> Result<()> {
    let key = encode_key("_ipp._tcp.local.", DnsType::Ptr)?;
    let value = placeholder_value();
    assert_eq!(&value[..], b"\x11ThresholdInstance\xc0\x1f");

    let record = synthesizer().synthesize(&key, &value)?;
    assert_eq!(
        record,
        Record::ptr("_ipp._tcp.local.", "ThresholdInstance._ipp._tcp.local.", TTL)?
    );
    assert!(record.is_placeholder());

    let real = Record::ptr("_ipp._tcp.local.", "printer._ipp._tcp.local.", TTL)?;
    assert!(!real.is_placeholder());
    Ok(())
}

#[test]
fn test_same_record_identity() -> Result<()> {
    let a = Record::ptr("_IPP._tcp.local.", "printer._ipp._tcp.local.", TTL)?;
    let b = Record::ptr("_ipp._tcp.local.", "printer._ipp._tcp.local.", 4500)?;
    let c = Record::ptr("_ipp._tcp.local.", "scanner._ipp._tcp.local.", TTL)?;
    assert!(a.same_record(&b));
    assert!(!a.same_record(&c));
    Ok(())
}

#[test]
fn test_table_add_is_idempotent() -> Result<()> {
    let mut table = ExternalRecordTable::new();
    let key = b"\x03foo\xc0\x0c\x00\x10\x01";
    let value = b"\x09txtvers=1";

    let first = synthesizer().synthesize(key, value)?;
    let again = synthesizer().synthesize(key, value)?;
    assert_eq!(
        table.add_or_skip(first, Transport::Awdl, 7),
        AddOutcome::Added
    );
    assert_eq!(
        table.add_or_skip(again, Transport::Awdl, 7),
        AddOutcome::DuplicateSuppressed
    );
    assert_eq!(table.len(), 1);
    Ok(())
}

#[test]
fn test_table_equivalent_encodings_are_one_record() -> Result<()> {
    let mut table = ExternalRecordTable::new();
    // The same name, compressed and spelled out.
    let compressed = synthesizer().synthesize(b"\x03foo\xc0\x0c\x00\x10\x01", b"\x01x")?;
    let literal = synthesizer().synthesize(b"\x03foo\x04_tcp\x05local\x00\x00\x10\x01", b"\x01x")?;

    assert_eq!(
        table.add_or_skip(compressed, Transport::Bluetooth, 1),
        AddOutcome::Added
    );
    assert_eq!(
        table.add_or_skip(literal, Transport::Bluetooth, 2),
        AddOutcome::DuplicateSuppressed
    );
    Ok(())
}

#[test]
fn test_table_remove_requires_same_value() -> Result<()> {
    let mut table = ExternalRecordTable::new();
    let key = b"\x03foo\xc0\x0c\x00\x10\x01";
    let record = synthesizer().synthesize(key, b"\x09txtvers=1")?;
    table.add_or_skip(record, Transport::Awdl, 1);

    let other = synthesizer().synthesize(key, b"\x09txtvers=2")?;
    assert!(table.remove_if_present(&other).is_none());
    assert_eq!(table.len(), 1);

    let same = synthesizer().synthesize(key, b"\x09txtvers=1")?;
    let removed = table.remove_if_present(&same).expect("record present");
    assert_eq!(removed.transport, Transport::Awdl);
    assert_eq!(removed.instance, 1);
    assert!(table.is_empty());
    Ok(())
}

#[test]
fn test_table_remove_matching() -> Result<()> {
    let mut table = ExternalRecordTable::new();
    table.add_or_skip(
        Record::ptr("_ipp._tcp.local.", "a._ipp._tcp.local.", TTL)?,
        Transport::Awdl,
        1,
    );
    table.add_or_skip(
        Record::ptr("_IPP._tcp.local.", "b._ipp._tcp.local.", TTL)?,
        Transport::Awdl,
        2,
    );
    table.add_or_skip(
        Record::srv("a._ipp._tcp.local.", 631, "a.local.", TTL)?,
        Transport::Awdl,
        1,
    );

    let removed = table.remove_matching("_ipp._tcp.local.", DnsType::Ptr);
    assert_eq!(removed.len(), 2);
    assert_eq!(table.len(), 1);
    assert_eq!(
        table.iter().next().map(|r| r.record.rr_type),
        Some(DnsType::Srv)
    );
    Ok(())
}
