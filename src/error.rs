/// The error type for fallible [`FlatHashTable`][table] operations and for
/// [`TableConfigBuilder`][builder] validation.
///
/// [table]: ../struct.FlatHashTable.html
/// [builder]: ../config/struct.TableConfigBuilder.html
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FlatTableError {
    /// The key collides with one of the words the buffer reserves for its own
    /// bookkeeping (`EMPTY` or `BUCKET_END`). Such a key would terminate bucket
    /// scans early, so it is rejected before the table is touched.
    #[error("key {0:#010x} is reserved as an internal sentinel and cannot be stored")]
    ReservedKey(u32),

    /// Bucket counts feed a mask-based hash reduction and must be a non-zero
    /// power of two.
    #[error("bucket count must be a non-zero power of two, got {0}")]
    InvalidBucketCount(usize),

    #[error("invalid table configuration: {0}")]
    InvalidConfig(&'static str),

    /// Directory slots hold 32-bit offsets, so the whole buffer must stay
    /// addressable by a `u32`.
    #[error("a buffer of {requested} words exceeds the 32-bit offset range")]
    CapacityOverflow { requested: usize },

    /// The index passed to `put_index` is not the key word of a live slot in the
    /// current buffer.
    #[error("index {0} does not address a live key slot")]
    InvalidSlot(usize),
}
