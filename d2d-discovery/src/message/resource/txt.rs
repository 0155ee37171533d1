use super::*;

/// One or more character strings, usually `key=value` service attributes.
///
/// Strings are kept as raw bytes: DNS-SD attribute values may be binary.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct TxtResource {
    pub(crate) txt: Vec<Vec<u8>>,
}

impl fmt::Display for TxtResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted: Vec<String> = self
            .txt
            .iter()
            .map(|s| format!("{:?}", String::from_utf8_lossy(s)))
            .collect();
        write!(f, "{}", quoted.join(" "))
    }
}

impl ResourceBody for TxtResource {
    fn real_type(&self) -> DnsType {
        DnsType::Txt
    }

    fn pack(&self, mut msg: Vec<u8>, _: &mut Compression, _: usize) -> Result<Vec<u8>> {
        for s in &self.txt {
            msg = pack_char_string(msg, s)?;
        }
        Ok(msg)
    }

    fn unpack(&mut self, msg: &[u8], mut off: usize, length: usize) -> Result<usize> {
        let end = off + length;
        let mut txt = vec![];
        while off < end {
            let (s, next) = unpack_char_string(msg, off)?;
            if next > end {
                return Err(Error::ErrCalcLen);
            }
            txt.push(s);
            off = next;
        }
        self.txt = txt;
        Ok(off)
    }
}
