use thiserror::Error;

/// Errors that can occur when creating or accessing a [`SerialBitmap`](crate::SerialBitmap)
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BitmapError {
    /// Capacity is zero, or storage for it could not be obtained
    #[error("cannot allocate bitmap storage for capacity {capacity}")]
    AllocationFailure { capacity: u64 },

    /// Handle was released, or its header does not decode to a usable capacity
    #[error("bitmap is released or its header is corrupt")]
    InvalidBitmap,

    /// Serial number outside `[0, capacity)`
    #[error("serial number {sn} is out of range for capacity {capacity}")]
    OutOfRange { sn: u64, capacity: u64 },

    /// Byte image length disagrees with the capacity in its header
    #[error("malformed bitmap image: expected {expected} bytes, got {actual}")]
    MalformedLayout { expected: usize, actual: usize },
}

/// A specialized Result type for bitmap operations
pub type Result<T> = std::result::Result<T, BitmapError>;
