mod bitmap;
mod error;
pub mod header;
mod scan;


pub use bitmap::{SerialBitmap, Vacancies};
pub use error::{BitmapError, Result};
pub use header::HEADER_WIDTH;

/// Number of body bytes needed to hold one bit per serial number.
///
/// Returns `None` if the byte count does not fit in a `usize` on this host.
pub fn body_len(capacity: u64) -> Option<usize> {
    usize::try_from(capacity.div_ceil(8)).ok()
}

/// Total size of the byte image for `capacity`: header plus bit body.
///
/// This is the length of the buffer `SerialBitmap::create` allocates and
/// the only length `SerialBitmap::from_bytes` accepts.
pub fn storage_len(capacity: u64) -> Option<usize> {
    body_len(capacity)?.checked_add(HEADER_WIDTH)
}

/// Body byte holding the bit for `sn`.
#[inline]
pub(crate) fn byte_index(sn: u64) -> usize {
    (sn >> 3) as usize
}

/// Mask selecting the bit for `sn` within its byte (MSB-first).
#[inline]
pub(crate) fn bit_mask(sn: u64) -> u8 {
    0x80u8 >> (sn & 7)
}
