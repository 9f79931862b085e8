//! In-band capacity header.
//!
//! Every bitmap image starts with its capacity encoded as a fixed-width
//! little-endian integer, so the image carries everything needed to
//! interpret the bit body that follows.

/// Width of the capacity header in bytes.
pub const HEADER_WIDTH: usize = size_of::<u64>();

/// Encode `capacity` as the header prefix.
#[inline]
pub const fn encode(capacity: u64) -> [u8; HEADER_WIDTH] {
    capacity.to_le_bytes()
}

/// Decode the capacity from the first `HEADER_WIDTH` bytes of `bytes`.
///
/// Returns `None` if `bytes` is shorter than the header. No check is made
/// on the decoded value; a zero capacity is the caller's to reject.
#[inline]
pub fn decode(bytes: &[u8]) -> Option<u64> {
    let prefix = bytes.first_chunk::<HEADER_WIDTH>()?;
    Some(u64::from_le_bytes(*prefix))
}
