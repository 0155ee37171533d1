//! Fixed-width big-endian fields and character strings.
//!
//! Packers append to an owned buffer and hand it back; unpackers take an
//! offset and return the value with the offset just past it.

use shared::error::{Error, Result};

const UINT16LEN: usize = 2;
const UINT32LEN: usize = 4;

pub(crate) fn pack_bytes(mut msg: Vec<u8>, field: &[u8]) -> Vec<u8> {
    msg.extend_from_slice(field);
    msg
}

pub(crate) fn unpack_bytes(msg: &[u8], off: usize, field: &mut [u8]) -> Result<usize> {
    let end = off + field.len();
    let src = msg.get(off..end).ok_or(Error::ErrBaseLen)?;
    field.copy_from_slice(src);
    Ok(end)
}

pub(crate) fn pack_uint16(mut msg: Vec<u8>, field: u16) -> Vec<u8> {
    msg.extend_from_slice(&field.to_be_bytes());
    msg
}

pub(crate) fn unpack_uint16(msg: &[u8], off: usize) -> Result<(u16, usize)> {
    let mut buf = [0u8; UINT16LEN];
    let off = unpack_bytes(msg, off, &mut buf)?;
    Ok((u16::from_be_bytes(buf), off))
}

pub(crate) fn pack_uint32(mut msg: Vec<u8>, field: u32) -> Vec<u8> {
    msg.extend_from_slice(&field.to_be_bytes());
    msg
}

pub(crate) fn unpack_uint32(msg: &[u8], off: usize) -> Result<(u32, usize)> {
    let mut buf = [0u8; UINT32LEN];
    let off = unpack_bytes(msg, off, &mut buf)?;
    Ok((u32::from_be_bytes(buf), off))
}

/// Appends a length-prefixed character string. Strings are limited to 255
/// bytes by the one byte length and may hold arbitrary bytes.
pub(crate) fn pack_char_string(mut msg: Vec<u8>, field: &[u8]) -> Result<Vec<u8>> {
    let len = u8::try_from(field.len()).map_err(|_| Error::ErrStringTooLong)?;
    msg.push(len);
    msg.extend_from_slice(field);
    Ok(msg)
}

pub(crate) fn unpack_char_string(msg: &[u8], off: usize) -> Result<(Vec<u8>, usize)> {
    let len = *msg.get(off).ok_or(Error::ErrBaseLen)? as usize;
    let begin = off + 1;
    let end = begin + len;
    let bytes = msg.get(begin..end).ok_or(Error::ErrCalcLen)?;
    Ok((bytes.to_vec(), end))
}
