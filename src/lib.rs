//! FlatHashTable: a `u32 -> u32` hash table whose directory and buckets share one
//! contiguous `Vec<u32>`, so inserting a pair never allocates a node.
//!
//! # Buffer layout
//!
//! ```text
//! [ dir[0] .. dir[n-1] | seg 0 | seg 1 | ... | seg n-1 ]
//!                        k v k v .. END
//! ```
//!
//! `dir[i]` is the absolute offset of bucket `i`'s segment. A segment is a run of
//! key/value word pairs followed by a single [`BUCKET_END`] word. Live pairs are
//! packed at the front of the segment; the first [`EMPTY`] key ends them. When a
//! segment is full, the whole buffer is rebuilt with extra slots spliced in at
//! that segment's end and every later directory offset shifted.
//!
//! ```rust
//! use flattable_rs::FlatHashTable;
//!
//! let mut table = FlatHashTable::new();
//! table.put(1, 10).unwrap();
//! table.add(1, 5).unwrap();
//! table.update_max(2, 9).unwrap();
//!
//! assert_eq!(table.get(1), Some(15));
//! assert_eq!(table.get(2), Some(9));
//! assert_eq!(table.get(3), None);
//! assert_eq!(table.len(), 2);
//! ```

pub mod config;
pub mod error;

use std::fmt;
use std::iter::FusedIterator;

pub use config::{TableConfig, TableConfigBuilder};
pub use error::FlatTableError;

use config::{initial_store_len, segment_len, MAX_STORE_LEN};

// ================================================================================================
// CONSTANTS
// ================================================================================================

/// Key word of an unused slot. Cannot be stored as a key.
pub const EMPTY: u32 = u32::MAX;

/// Last word of every segment. Cannot be stored as a key.
pub const BUCKET_END: u32 = u32::MAX - 1;

/// Returns true for the two words the buffer reserves for itself.
#[inline(always)]
pub const fn is_reserved(key: u32) -> bool {
    key >= BUCKET_END
}

/// Outcome of scanning one segment for a key.
enum Probe {
    /// Index of the matching key word.
    Found(usize),
    /// Index of the first unused slot.
    Vacant(usize),
    /// Index of the segment's end sentinel; the segment has no room left.
    Full(usize),
}

// ================================================================================================
// MAIN TABLE STRUCTURE
// ================================================================================================

/// Hash table of `u32` keys to `u32` values stored in a single word buffer.
///
/// Not internally synchronized: share it across threads behind a lock.
#[derive(Clone)]
pub struct FlatHashTable {
    store: Vec<u32>,
    bucket_count: usize,
    // Total slots allocated across all segments. Bookkeeping only.
    capacity: usize,
    size: usize,
    config: TableConfig,
}

// ================================================================================================
// CONSTRUCTORS
// ================================================================================================

impl FlatHashTable {
    /// Create an empty table with the default configuration (2 buckets of 2 slots).
    pub fn new() -> Self {
        let config = TableConfig::default();
        let bucket_count = config.initial_bucket_count;
        let store_len = bucket_count + bucket_count * segment_len(config.bucket_slots);
        Self::allocate(config, bucket_count, store_len)
    }

    /// Create an empty table with `bucket_count` buckets and otherwise default
    /// parameters.
    pub fn with_bucket_count(bucket_count: usize) -> Result<Self, FlatTableError> {
        TableConfig::builder()
            .initial_bucket_count(bucket_count)
            .build()
    }

    /// Create an empty table from a configuration. The configuration is validated
    /// first.
    pub fn with_config(config: TableConfig) -> Result<Self, FlatTableError> {
        config.validate()?;
        let bucket_count = config.initial_bucket_count;
        let store_len = initial_store_len(bucket_count, config.bucket_slots)?;
        Ok(Self::allocate(config, bucket_count, store_len))
    }

    /// Start configuring a table.
    pub fn builder() -> TableConfigBuilder {
        TableConfig::builder()
    }

    /// Lay out a fresh buffer. `store_len` must come from `initial_store_len` for the
    /// same bucket count and slot count.
    fn allocate(config: TableConfig, bucket_count: usize, store_len: usize) -> Self {
        let seg = segment_len(config.bucket_slots);
        let mut store = vec![EMPTY; store_len];
        for bucket in 0..bucket_count {
            let start = bucket_count + bucket * seg;
            store[bucket] = start as u32;
            store[start + seg - 1] = BUCKET_END;
        }
        Self {
            store,
            bucket_count,
            capacity: bucket_count * config.bucket_slots,
            size: 0,
            config,
        }
    }

    // ============================================================================================
    // PUBLIC API METHODS
    // ============================================================================================

    /// Returns the value stored for `key`.
    ///
    /// Reserved keys are never present, so looking one up returns `None`.
    pub fn get(&self, key: u32) -> Option<u32> {
        match self.probe(self.bucket_index(key), key) {
            Probe::Found(index) => Some(self.store[index + 1]),
            Probe::Vacant(_) | Probe::Full(_) => None,
        }
    }

    /// Returns the value stored for `key`, or `0` when the key is absent.
    ///
    /// A stored `0` and a missing key are indistinguishable here; prefer [`get`]
    /// unless that convention is required.
    ///
    /// [`get`]: FlatHashTable::get
    pub fn get_or_zero(&self, key: u32) -> u32 {
        self.get(key).unwrap_or(0)
    }

    /// Check whether the given key is present.
    pub fn contains_key(&self, key: u32) -> bool {
        self.get_index(key).is_some()
    }

    /// Inserts a key-value pair, returning the value previously stored for `key`.
    ///
    /// May splice the key's segment or rehash the whole table; either invalidates
    /// indices obtained from [`get_index`](FlatHashTable::get_index).
    ///
    /// # Errors
    ///
    /// * [`FlatTableError::ReservedKey`] if `key` is [`EMPTY`] or [`BUCKET_END`].
    /// * [`FlatTableError::CapacityOverflow`] if the segment must grow but the
    ///   buffer would no longer be addressable by 32-bit offsets. The table is
    ///   unchanged in that case.
    ///
    /// A rehash that would outgrow 32-bit offsets is not an error: the pair is
    /// stored and the table keeps its current bucket count.
    pub fn put(&mut self, key: u32, value: u32) -> Result<Option<u32>, FlatTableError> {
        check_key(key)?;
        self.insert(key, value, true)
    }

    /// Adds `value` to the value stored for `key` (wrapping on overflow), or inserts
    /// `value` if the key is absent. Returns the value now stored.
    pub fn add(&mut self, key: u32, value: u32) -> Result<u32, FlatTableError> {
        self.merge(key, value, u32::wrapping_add)
    }

    /// Keeps the larger of the stored value and `value`, or inserts `value` if the
    /// key is absent. Returns the value now stored.
    pub fn update_max(&mut self, key: u32, value: u32) -> Result<u32, FlatTableError> {
        self.merge(key, value, |current, value| current.max(value))
    }

    /// Returns an iterator over the key-value pairs, in bucket order and then
    /// segment order. This is not insertion order.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Returns an iterator over the keys, in the same order as [`iter`](Self::iter).
    pub fn keys(&self) -> Keys<'_> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values, in the same order as [`iter`](Self::iter).
    pub fn values(&self) -> Values<'_> {
        Values { inner: self.iter() }
    }

    /// Collects every pair into a `Vec`, in the same order as [`iter`](Self::iter).
    pub fn to_pairs(&self) -> Vec<(u32, u32)> {
        self.iter().collect()
    }

    /// Returns the number of key-value pairs in the table.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true if the table contains no pairs.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of buckets in the directory. Always a power of two.
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// Total key/value slots allocated across all segments.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Bucket that `key` maps to under the current bucket count.
    #[inline(always)]
    pub fn bucket_index(&self, key: u32) -> usize {
        bucket_of(key, self.bucket_count)
    }

    /// Exposes the backing buffer and the directory size.
    ///
    /// Directory slots are `buffer[..bucket_count]`; everything after is segment
    /// data. The layout is an implementation detail and may change between
    /// versions.
    pub fn raw_view(&self) -> (&[u32], usize) {
        (&self.store, self.bucket_count)
    }

    // ============================================================================================
    // LOW-LEVEL SLOT ACCESS
    // ============================================================================================

    /// Returns the buffer index of `key`'s key word, if present.
    ///
    /// The index addresses the raw buffer (see [`raw_view`](Self::raw_view)) and is
    /// always `>= bucket_count()`. It stays valid only until the next call that
    /// can insert (`put`, `add`, `update_max`), since those may rebuild the buffer.
    pub fn get_index(&self, key: u32) -> Option<usize> {
        match self.probe(self.bucket_index(key), key) {
            Probe::Found(index) => Some(index),
            Probe::Vacant(_) | Probe::Full(_) => None,
        }
    }

    /// Overwrites the value of the slot whose key word is at `index`, as returned by
    /// [`get_index`](Self::get_index).
    ///
    /// # Errors
    ///
    /// [`FlatTableError::InvalidSlot`] if `index` is not the key word of a live slot.
    pub fn put_index(&mut self, index: usize, value: u32) -> Result<(), FlatTableError> {
        if !self.is_live_key_word(index) {
            return Err(FlatTableError::InvalidSlot(index));
        }
        self.store[index + 1] = value;
        Ok(())
    }

    fn is_live_key_word(&self, index: usize) -> bool {
        if index < self.bucket_count || index >= self.store.len() - 1 {
            return false;
        }
        // Directory offsets ascend with the bucket index.
        let directory = &self.store[..self.bucket_count];
        let bucket = directory.partition_point(|&start| start as usize <= index) - 1;
        let start = directory[bucket] as usize;
        (index - start) % 2 == 0 && !is_reserved(self.store[index])
    }

    // ============================================================================================
    // INTERNAL OPERATIONS
    // ============================================================================================

    /// Scan `bucket`'s segment for `key`. Sentinels are tested first so a reserved key
    /// can never be reported as found.
    #[inline(always)]
    fn probe(&self, bucket: usize, key: u32) -> Probe {
        let mut index = self.store[bucket] as usize;
        loop {
            match self.store[index] {
                EMPTY => return Probe::Vacant(index),
                BUCKET_END => return Probe::Full(index),
                word if word == key => return Probe::Found(index),
                _ => index += 2,
            }
        }
    }

    /// Insert without validating the key. `resize` is false while a rehash is
    /// reinserting into its fresh table.
    fn insert(
        &mut self,
        key: u32,
        value: u32,
        resize: bool,
    ) -> Result<Option<u32>, FlatTableError> {
        let bucket = self.bucket_index(key);
        match self.probe(bucket, key) {
            Probe::Found(index) => {
                let previous = std::mem::replace(&mut self.store[index + 1], value);
                Ok(Some(previous))
            }
            Probe::Vacant(index) => {
                self.store[index] = key;
                self.store[index + 1] = value;
                self.increment_size(resize);
                Ok(None)
            }
            Probe::Full(end) => {
                self.splice(bucket, end)?;
                self.store[end] = key;
                self.store[end + 1] = value;
                self.increment_size(resize);
                Ok(None)
            }
        }
    }

    fn merge<F>(&mut self, key: u32, value: u32, f: F) -> Result<u32, FlatTableError>
    where
        F: FnOnce(u32, u32) -> u32,
    {
        check_key(key)?;
        match self.get_index(key) {
            Some(index) => {
                let slot = &mut self.store[index + 1];
                *slot = f(*slot, value);
                Ok(*slot)
            }
            None => {
                self.insert(key, value, true)?;
                Ok(value)
            }
        }
    }

    /// Grow `bucket`'s segment, whose end sentinel sits at `end`, by `growth_slots`
    /// slots. The new slots start at `end`.
    fn splice(&mut self, bucket: usize, end: usize) -> Result<(), FlatTableError> {
        let growth_slots = self.config.growth_slots;
        let width = 2 * growth_slots;
        let new_len = self.store.len() + width;
        if new_len > MAX_STORE_LEN {
            return Err(FlatTableError::CapacityOverflow { requested: new_len });
        }

        let mut grown = Vec::with_capacity(new_len);
        grown.extend_from_slice(&self.store[..end]);
        grown.resize(end + width, EMPTY);
        grown.push(BUCKET_END);
        // Later segments keep their order and contents, shifted right by `width`.
        grown.extend_from_slice(&self.store[end + 1..]);
        for start in &mut grown[bucket + 1..self.bucket_count] {
            *start += width as u32;
        }

        #[cfg(feature = "logging")]
        log::trace!(
            "spliced {} slots into bucket {}; buffer is now {} words",
            growth_slots,
            bucket,
            new_len
        );

        self.store = grown;
        self.capacity += growth_slots;
        Ok(())
    }

    fn increment_size(&mut self, resize: bool) {
        self.size += 1;
        if resize {
            self.resize_on_threshold();
        }
    }

    fn resize_on_threshold(&mut self) {
        let Some(target) = self.resize_target() else {
            return;
        };

        #[cfg(feature = "logging")]
        log::debug!(
            "rehashing {} pairs from {} to {} buckets",
            self.size,
            self.bucket_count,
            target
        );

        // A table too large to re-lay out keeps working at its current bucket count.
        if let Err(_err) = self.rehash(target) {
            #[cfg(feature = "logging")]
            log::debug!("skipped rehash to {} buckets: {}", target, _err);
        }
    }

    fn resize_target(&self) -> Option<usize> {
        let config = &self.config;
        // f64 rather than f32: exact for every bucket count a u32 buffer can hold.
        let buckets = self.bucket_count as f64;
        if self.size < (buckets * config.shrink_load_factor) as usize
            && self.size > config.shrink_floor
            && self.bucket_count > 1
        {
            Some(self.bucket_count >> 1)
        } else if self.size > (buckets * config.grow_load_factor) as usize {
            self.bucket_count.checked_mul(1 << config.grow_shift)
        } else {
            None
        }
    }

    /// Rebuild the table at `bucket_count` buckets. `self` is replaced only once every
    /// pair has been reinserted.
    fn rehash(&mut self, bucket_count: usize) -> Result<(), FlatTableError> {
        let store_len = initial_store_len(bucket_count, self.config.bucket_slots)?;
        let mut fresh = Self::allocate(self.config, bucket_count, store_len);
        for (key, value) in self.iter() {
            fresh.insert(key, value, false)?;
        }
        *self = fresh;
        Ok(())
    }
}

// ================================================================================================
// STANDARD TRAIT IMPLEMENTATIONS
// ================================================================================================

impl Default for FlatHashTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FlatHashTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a FlatHashTable {
    type Item = (u32, u32);
    type IntoIter = Iter<'a>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// # Panics
///
/// Panics if the iterator yields a reserved key.
impl FromIterator<(u32, u32)> for FlatHashTable {
    fn from_iter<T: IntoIterator<Item = (u32, u32)>>(iter: T) -> Self {
        let mut table = FlatHashTable::new();
        table.extend(iter);
        table
    }
}

/// # Panics
///
/// Panics if the iterator yields a reserved key, or if the buffer outgrows 32-bit
/// offsets.
impl Extend<(u32, u32)> for FlatHashTable {
    fn extend<T: IntoIterator<Item = (u32, u32)>>(&mut self, iter: T) {
        for (key, value) in iter {
            if let Err(err) = self.put(key, value) {
                panic!("FlatHashTable::extend: {err}");
            }
        }
    }
}

// ================================================================================================
// UTILITY FUNCTIONS
// ================================================================================================

/// Fixed bit-mixing reduction of `key` onto `bucket_count` buckets (a power of two).
#[inline(always)]
fn bucket_of(key: u32, bucket_count: usize) -> usize {
    let mixed = key ^ (key >> 20) ^ (key >> 12) ^ (key >> 7) ^ (key >> 4);
    (mixed & (bucket_count as u32).wrapping_sub(1)) as usize
}

#[inline(always)]
fn check_key(key: u32) -> Result<(), FlatTableError> {
    if is_reserved(key) {
        Err(FlatTableError::ReservedKey(key))
    } else {
        Ok(())
    }
}

// ================================================================================================
// ITERATOR IMPLEMENTATIONS
// ================================================================================================

/// Iterator over the pairs of a [`FlatHashTable`], walking each segment's live prefix
/// bucket by bucket.
#[derive(Clone)]
pub struct Iter<'a> {
    store: &'a [u32],
    bucket_count: usize,
    bucket: usize,
    index: usize,
    remaining: usize,
}

impl<'a> Iter<'a> {
    fn new(table: &'a FlatHashTable) -> Self {
        Self {
            store: &table.store,
            bucket_count: table.bucket_count,
            bucket: 0,
            index: table.store[0] as usize,
            remaining: table.size,
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        while self.bucket < self.bucket_count {
            match self.store[self.index] {
                // No live pair follows the first unused slot of a segment.
                EMPTY | BUCKET_END => {
                    self.bucket += 1;
                    if self.bucket < self.bucket_count {
                        self.index = self.store[self.bucket] as usize;
                    }
                }
                key => {
                    let value = self.store[self.index + 1];
                    self.index += 2;
                    self.remaining -= 1;
                    return Some((key, value));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

/// Iterator over the keys of a [`FlatHashTable`].
#[derive(Clone)]
pub struct Keys<'a> {
    inner: Iter<'a>,
}

impl Iterator for Keys<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Keys<'_> {}

impl FusedIterator for Keys<'_> {}

/// Iterator over the values of a [`FlatHashTable`].
#[derive(Clone)]
pub struct Values<'a> {
    inner: Iter<'a>,
}

impl Iterator for Values<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Values<'_> {}

impl FusedIterator for Values<'_> {}
