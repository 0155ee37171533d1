/// Default number of bytes shown by [`hex_dump`].
pub const HEX_DUMP_LIMIT: usize = 32;

/// hex_dump renders at most `limit` bytes of `buf` as lowercase hex, noting
/// how many bytes were left out.
pub fn hex_dump(buf: &[u8], limit: usize) -> String {
    if buf.len() <= limit {
        hex::encode(buf)
    } else {
        format!(
            "{}... ({} more bytes)",
            hex::encode(&buf[..limit]),
            buf.len() - limit
        )
    }
}
