use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::error::Error;

/// Link-layer (MAC) address of a proximity peer.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EthAddr(pub [u8; 6]);

impl EthAddr {
    pub const fn new(b: [u8; 6]) -> Self {
        Self(b)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for EthAddr {
    fn from(b: [u8; 6]) -> Self {
        Self(b)
    }
}

impl fmt::Display for EthAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for EthAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut b = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for octet in b.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| Error::ErrInvalidEthAddr(s.to_owned()))?;
            if part.len() != 2 {
                return Err(Error::ErrInvalidEthAddr(s.to_owned()));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| Error::ErrInvalidEthAddr(s.to_owned()))?;
        }
        if parts.next().is_some() {
            return Err(Error::ErrInvalidEthAddr(s.to_owned()));
        }
        Ok(Self(b))
    }
}

/// A generic inbound message tagged with its arrival time and sender.
pub struct TransportMessage<T> {
    /// Received time
    pub now: Instant,
    /// Link-layer address of the peer that sent the message
    pub peer_addr: EthAddr,
    /// Message body with generic type
    pub message: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eth_addr_display_and_parse() {
        let addr = EthAddr::new([0x00, 0x1b, 0x63, 0x84, 0x45, 0xe6]);
        assert_eq!(addr.to_string(), "00:1b:63:84:45:e6");
        assert_eq!("00:1b:63:84:45:e6".parse::<EthAddr>(), Ok(addr));
        assert_eq!("00-1B-63-84-45-E6".parse::<EthAddr>(), Ok(addr));
    }

    #[test]
    fn test_eth_addr_parse_rejects_bad_input() {
        assert!("00:1b:63:84:45".parse::<EthAddr>().is_err());
        assert!("00:1b:63:84:45:e6:07".parse::<EthAddr>().is_err());
        assert!("001b:63:84:45:e6".parse::<EthAddr>().is_err());
        assert!("zz:1b:63:84:45:e6".parse::<EthAddr>().is_err());
    }
}
