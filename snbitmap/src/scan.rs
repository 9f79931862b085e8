//! Word/byte tiered scans over a validated bit body.
//!
//! All functions here take the body slice and the capacity it was validated
//! against; `body.len() == ceil(capacity / 8)` is assumed. Bits are MSB-first:
//! serial `sn` is bit `7 - (sn & 7)` of byte `sn >> 3`.

use crate::byte_index;

/// Bytes per tier-1 word.
const WORD_BYTES: usize = size_of::<u64>();

/// Granularity at which the completeness scan found a clear bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tier {
    /// A 64-bit word of the leading `capacity / 64` words.
    Word,
    /// One of the `(capacity % 64) / 8` whole bytes after the last word.
    Byte,
    /// The final partial byte holding `capacity % 8` live bits.
    PartialByte,
}

/// Assemble 8 body bytes into a `u64`, little-endian.
///
/// Only used for all-ones and popcount tests, which do not depend on the
/// byte order; fixing it keeps the read independent of host endianness and
/// alignment.
#[inline]
fn read_word(chunk: &[u8]) -> u64 {
    let mut word = [0u8; WORD_BYTES];
    word.copy_from_slice(chunk);
    u64::from_le_bytes(word)
}

/// Mask of the bits in body byte `index` that belong to serials below
/// `capacity`. Padding bits of the final partial byte are excluded.
#[inline]
fn live_mask(capacity: u64, index: usize) -> u8 {
    let first = (index as u64) << 3;
    let live = capacity.saturating_sub(first);
    if live >= 8 { u8::MAX } else { !(u8::MAX >> live) }
}

/// Find the first tier holding a clear bit, or `None` if every serial in
/// `[0, capacity)` is set.
///
/// Tier 1 compares whole words, tier 2 whole bytes, and tier 3 shifts the
/// padding out of the final byte before comparing. Tier 3 is skipped when
/// `capacity` is a multiple of 8.
pub(crate) fn find_vacant_tier(body: &[u8], capacity: u64) -> Option<Tier> {
    let words = (capacity >> 6) as usize;
    let bytes = ((capacity & 0x3F) >> 3) as usize;
    let remainder = (capacity & 0x07) as u32;

    let (word_region, rest) = body.split_at(words * WORD_BYTES);
    if word_region
        .chunks_exact(WORD_BYTES)
        .any(|chunk| read_word(chunk) != u64::MAX)
    {
        return Some(Tier::Word);
    }

    let (byte_region, rest) = rest.split_at(bytes);
    if byte_region.iter().any(|&b| b != u8::MAX) {
        return Some(Tier::Byte);
    }

    if remainder != 0 {
        let observed = rest[0] >> (8 - remainder);
        if observed != u8::MAX >> (8 - remainder) {
            return Some(Tier::PartialByte);
        }
    }

    None
}

/// Count set serials, ignoring padding bits.
pub(crate) fn count_set(body: &[u8], capacity: u64) -> u64 {
    let (whole, tail) = body.split_at((capacity >> 3) as usize);

    let mut words = whole.chunks_exact(WORD_BYTES);
    let mut count: u64 = words
        .by_ref()
        .map(|chunk| u64::from(read_word(chunk).count_ones()))
        .sum();
    count += words
        .remainder()
        .iter()
        .map(|b| u64::from(b.count_ones()))
        .sum::<u64>();

    if let Some(&last) = tail.first() {
        count += u64::from((last & live_mask(capacity, whole.len())).count_ones());
    }

    count
}

/// Find the smallest clear serial `>= from`.
///
/// Fully-set words are skipped when `from` is word aligned, fully-set bytes
/// otherwise.
pub(crate) fn next_vacancy(body: &[u8], capacity: u64, from: u64) -> Option<u64> {
    let mut sn = from;

    while sn < capacity {
        let index = byte_index(sn);

        if sn & 63 == 0 && capacity - sn >= 64 {
            if read_word(&body[index..index + WORD_BYTES]) == u64::MAX {
                sn += 64;
                continue;
            }
        }

        let from_bit = u8::MAX >> (sn & 7);
        let gaps = !body[index] & live_mask(capacity, index) & from_bit;
        if gaps != 0 {
            return Some(((index as u64) << 3) + u64::from(gaps.leading_zeros()));
        }

        sn = (index as u64 + 1) << 3;
    }

    None
}
