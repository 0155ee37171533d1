#![allow(dead_code)]

use std::string::FromUtf8Error;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("mutex poison: {0}")]
    PoisonError(String),

    /// ErrConnectionClosed indicates an operation executed after the engine
    /// has already been closed.
    #[error("conn is closed")]
    ErrConnectionClosed,

    //DNS record codec errors
    #[error("insufficient data for base length type")]
    ErrBaseLen,
    #[error("insufficient data for calculated length type")]
    ErrCalcLen,
    #[error("segment prefix is reserved")]
    ErrReserved,
    #[error("too many pointers (>10)")]
    ErrTooManyPtr,
    #[error("invalid pointer")]
    ErrInvalidPtr,
    #[error("nil resource body")]
    ErrNilResourceBody,
    #[error("insufficient data for resource body length")]
    ErrResourceLen,
    #[error("segment length too long")]
    ErrSegTooLong,
    #[error("zero length segment")]
    ErrZeroSegLen,
    #[error("resource length too long")]
    ErrResTooLong,
    #[error("name is not in canonical format (it must end with a .)")]
    ErrNonCanonicalName,
    #[error("character string exceeds maximum length (255)")]
    ErrStringTooLong,
    #[error("unsupported resource type: {0}")]
    ErrUnsupportedResourceType(u16),

    //Discovery errors
    #[error("service type {0} cannot be represented on the beacon")]
    ErrHashUnrepresentable(String),
    #[error("malformed plugin key: {0}")]
    ErrKeyMalformed(String),
    #[error("unsupported plugin key version: {0}")]
    ErrUnsupportedKeyVersion(u8),
    #[error("carrier capacity exceeded: need {needed} bytes, capacity {capacity}")]
    ErrCapacityExceeded { needed: usize, capacity: usize },
    #[error("beacon based discovery is disabled")]
    ErrDiscoveryDisabled,
    #[error("request does not apply to the beacon transport")]
    ErrNotBeaconEligible,
    #[error("invalid link-layer address: {0}")]
    ErrInvalidEthAddr(String),

    #[error("utf8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

impl Error {
    /// Reports whether the error came from malformed external input, which is
    /// dropped and logged rather than surfaced.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Error::ErrKeyMalformed(_)
                | Error::ErrUnsupportedKeyVersion(_)
                | Error::ErrCapacityExceeded { .. }
                | Error::ErrBaseLen
                | Error::ErrCalcLen
                | Error::ErrReserved
                | Error::ErrTooManyPtr
                | Error::ErrInvalidPtr
                | Error::ErrNilResourceBody
                | Error::ErrResourceLen
                | Error::ErrSegTooLong
                | Error::ErrZeroSegLen
                | Error::ErrResTooLong
                | Error::ErrStringTooLong
                | Error::ErrUnsupportedResourceType(_)
                | Error::Utf8(_)
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::PoisonError(e.to_string())
    }
}
