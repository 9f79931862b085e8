use std::fmt;
use std::iter::FusedIterator;

use tracing::{debug, trace};

use crate::error::{BitmapError, Result};
use crate::header::{self, HEADER_WIDTH};
use crate::scan;
use crate::{bit_mask, byte_index, storage_len};

/// A bitmap recording which serial numbers in `0..capacity` have been seen.
///
/// The value owns a single buffer: the capacity header (see [`header`])
/// followed by one bit per serial number, most-significant bit first within
/// each byte. The buffer IS the persisted form, and the capacity is always
/// recovered from it rather than stored on the side.
///
/// Bits only ever go from clear to set. Once [`release`](Self::release) has
/// been called the storage is gone and every operation fails with
/// [`BitmapError::InvalidBitmap`].
///
/// Equality compares byte images, so two bitmaps parsed from images that
/// differ only in padding bits are not equal.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "allocative", derive(allocative::Allocative))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<u8>", into = "Vec<u8>"))]
pub struct SerialBitmap {
    storage: Vec<u8>,
}

impl SerialBitmap {
    /// Create a bitmap able to track serial numbers `0..capacity`, all clear.
    ///
    /// Fails with [`BitmapError::AllocationFailure`] if `capacity` is zero or
    /// if the storage cannot be obtained.
    pub fn create(capacity: u64) -> Result<Self> {
        if capacity == 0 {
            return Err(BitmapError::AllocationFailure { capacity });
        }

        let len = storage_len(capacity).ok_or(BitmapError::AllocationFailure { capacity })?;

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(len)
            .map_err(|_| BitmapError::AllocationFailure { capacity })?;
        storage.extend_from_slice(&header::encode(capacity));
        storage.resize(len, 0);

        debug!(capacity, bytes = len, "allocated serial bitmap");
        Ok(Self { storage })
    }

    /// Rebuild a bitmap from its byte image.
    ///
    /// The image must be exactly a header plus `ceil(capacity / 8)` body
    /// bytes. Padding bits in the final byte are kept as-is and ignored.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let actual = bytes.len();
        let Some(capacity) = header::decode(&bytes) else {
            return Err(BitmapError::MalformedLayout {
                expected: HEADER_WIDTH,
                actual,
            });
        };

        if capacity == 0 {
            return Err(BitmapError::InvalidBitmap);
        }

        let expected = storage_len(capacity).unwrap_or(usize::MAX);
        if expected != actual {
            return Err(BitmapError::MalformedLayout { expected, actual });
        }

        debug!(capacity, bytes = actual, "parsed serial bitmap image");
        Ok(Self { storage: bytes })
    }

    /// The number of serial numbers this bitmap tracks, decoded from its header.
    pub fn capacity(&self) -> Result<u64> {
        self.layout().map(|(capacity, _)| capacity)
    }

    /// Validate that the handle is live and `sn` is below its capacity.
    ///
    /// Every serial-addressed operation runs this check before it touches
    /// the body.
    pub fn precheck(&self, sn: u64) -> Result<()> {
        self.addressed(sn).map(|_| ())
    }

    /// Test whether `sn` has been recorded.
    pub fn check(&self, sn: u64) -> Result<bool> {
        let body = self.addressed(sn)?;
        Ok(body[byte_index(sn)] & bit_mask(sn) != 0)
    }

    /// Record `sn`. Setting an already-set serial is a no-op.
    pub fn set(&mut self, sn: u64) -> Result<()> {
        let body = self.addressed_mut(sn)?;
        body[byte_index(sn)] |= bit_mask(sn);
        Ok(())
    }

    /// Record `sn`, returning whether it had already been recorded.
    ///
    /// Useful for dropping duplicate packets on arrival.
    pub fn test_and_set(&mut self, sn: u64) -> Result<bool> {
        let body = self.addressed_mut(sn)?;
        let byte = &mut body[byte_index(sn)];
        let mask = bit_mask(sn);
        let was_set = *byte & mask != 0;
        *byte |= mask;
        Ok(was_set)
    }

    /// Returns `true` if every serial number in `0..capacity` is recorded.
    ///
    /// Runs in O(capacity / 64): whole 64-bit words first, then whole
    /// bytes, then the live bits of the final partial byte. Stops at the
    /// first vacancy.
    pub fn is_full(&self) -> Result<bool> {
        let (capacity, body) = self.layout()?;

        match scan::find_vacant_tier(body, capacity) {
            None => Ok(true),
            Some(tier) => {
                trace!(capacity, ?tier, "vacancy found");
                Ok(false)
            }
        }
    }

    /// Count the recorded serial numbers.
    pub fn count(&self) -> Result<u64> {
        let (capacity, body) = self.layout()?;
        Ok(scan::count_set(body, capacity))
    }

    /// Iterate over serial numbers that have not been recorded, ascending.
    pub fn vacancies(&self) -> Result<Vacancies<'_>> {
        let (capacity, body) = self.layout()?;
        Ok(Vacancies {
            body,
            capacity,
            next: 0,
        })
    }

    /// Free the storage. Every later operation returns
    /// [`BitmapError::InvalidBitmap`]; releasing twice is a no-op.
    pub fn release(&mut self) {
        let storage = std::mem::take(&mut self.storage);
        match header::decode(&storage) {
            Some(capacity) => debug!(capacity, "released serial bitmap"),
            None => trace!("release of an already released bitmap"),
        }
    }

    /// Whether [`release`](Self::release) has been called.
    pub fn is_released(&self) -> bool {
        self.storage.is_empty()
    }

    /// The byte image: header followed by the bit body. Empty once released.
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage
    }

    /// Consume the bitmap, returning its byte image.
    pub fn into_bytes(self) -> Vec<u8> {
        self.storage
    }

    /// Decoded capacity and bit body, or `InvalidBitmap` if the storage is
    /// gone or disagrees with its header.
    fn layout(&self) -> Result<(u64, &[u8])> {
        let capacity = self.live_capacity()?;
        Ok((capacity, &self.storage[HEADER_WIDTH..]))
    }

    fn live_capacity(&self) -> Result<u64> {
        let capacity = header::decode(&self.storage).ok_or(BitmapError::InvalidBitmap)?;
        if capacity == 0 || storage_len(capacity) != Some(self.storage.len()) {
            return Err(BitmapError::InvalidBitmap);
        }
        Ok(capacity)
    }

    fn addressed(&self, sn: u64) -> Result<&[u8]> {
        let (capacity, body) = self.layout()?;
        if sn >= capacity {
            return Err(BitmapError::OutOfRange { sn, capacity });
        }
        Ok(body)
    }

    fn addressed_mut(&mut self, sn: u64) -> Result<&mut [u8]> {
        let capacity = self.live_capacity()?;
        if sn >= capacity {
            return Err(BitmapError::OutOfRange { sn, capacity });
        }
        Ok(&mut self.storage[HEADER_WIDTH..])
    }
}

impl fmt::Debug for SerialBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.layout() {
            Ok((capacity, body)) => f
                .debug_struct("SerialBitmap")
                .field("capacity", &capacity)
                .field("recorded", &scan::count_set(body, capacity))
                .finish(),
            Err(_) => f.write_str("SerialBitmap(<released>)"),
        }
    }
}

impl TryFrom<Vec<u8>> for SerialBitmap {
    type Error = BitmapError;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        Self::from_bytes(bytes)
    }
}

impl TryFrom<&[u8]> for SerialBitmap {
    type Error = BitmapError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes(bytes.to_vec())
    }
}

impl From<SerialBitmap> for Vec<u8> {
    fn from(bitmap: SerialBitmap) -> Self {
        bitmap.into_bytes()
    }
}

/// Iterator over the unrecorded serial numbers of a [`SerialBitmap`].
///
/// Runs of recorded serials are skipped a word or a byte at a time.
pub struct Vacancies<'a> {
    body: &'a [u8],
    capacity: u64,
    next: u64,
}

impl Iterator for Vacancies<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        match scan::next_vacancy(self.body, self.capacity, self.next) {
            Some(sn) => {
                self.next = sn + 1;
                Some(sn)
            }
            None => {
                self.next = self.capacity;
                None
            }
        }
    }
}

impl FusedIterator for Vacancies<'_> {}
