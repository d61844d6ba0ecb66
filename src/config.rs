//! Tunables for [`FlatHashTable`](crate::FlatHashTable).
//!
//! A [`TableConfig`] is fixed when a table is created and carried over to every
//! table built during a rehash, so the layout parameters never change under a
//! live table.

use crate::error::FlatTableError;
use crate::FlatHashTable;

// ================================================================================================
// DEFAULTS
// ================================================================================================

/// Directory size of a table created with [`FlatHashTable::new`].
pub const DEFAULT_BUCKET_COUNT: usize = 1 << 1;

/// Key/value slots allocated to every bucket segment of a fresh table.
pub const DEFAULT_BUCKET_SLOTS: usize = 1 << 1;

/// Key/value slots spliced into a segment when it runs out of room.
pub const DEFAULT_GROWTH_SLOTS: usize = 1 << 1;

/// Shrink when `len < bucket_count * DEFAULT_SHRINK_LOAD_FACTOR`.
pub const DEFAULT_SHRINK_LOAD_FACTOR: f64 = 0.2;

/// Grow when `len > bucket_count * DEFAULT_GROW_LOAD_FACTOR`.
pub const DEFAULT_GROW_LOAD_FACTOR: f64 = 6.0;

/// Growing multiplies the bucket count by `1 << DEFAULT_GROW_SHIFT`.
pub const DEFAULT_GROW_SHIFT: u32 = 1;

/// Tables holding this many pairs or fewer never shrink.
pub const DEFAULT_SHRINK_FLOOR: usize = DEFAULT_BUCKET_COUNT;

const MAX_GROW_SHIFT: u32 = 16;

/// Largest buffer length whose every index still fits in a directory word.
pub(crate) const MAX_STORE_LEN: usize = u32::MAX as usize;

// ================================================================================================
// CONFIG
// ================================================================================================

/// Layout and resize parameters of a [`FlatHashTable`].
///
/// Build one with [`TableConfig::builder`]; `TableConfig::default()` matches the
/// parameters used by [`FlatHashTable::new`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableConfig {
    pub(crate) initial_bucket_count: usize,
    pub(crate) bucket_slots: usize,
    pub(crate) growth_slots: usize,
    pub(crate) shrink_load_factor: f64,
    pub(crate) grow_load_factor: f64,
    pub(crate) grow_shift: u32,
    pub(crate) shrink_floor: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_bucket_count: DEFAULT_BUCKET_COUNT,
            bucket_slots: DEFAULT_BUCKET_SLOTS,
            growth_slots: DEFAULT_GROWTH_SLOTS,
            shrink_load_factor: DEFAULT_SHRINK_LOAD_FACTOR,
            grow_load_factor: DEFAULT_GROW_LOAD_FACTOR,
            grow_shift: DEFAULT_GROW_SHIFT,
            shrink_floor: DEFAULT_SHRINK_FLOOR,
        }
    }
}

impl TableConfig {
    /// Start a builder seeded with the default parameters.
    pub fn builder() -> TableConfigBuilder {
        TableConfigBuilder::default()
    }

    pub fn initial_bucket_count(&self) -> usize {
        self.initial_bucket_count
    }

    pub fn bucket_slots(&self) -> usize {
        self.bucket_slots
    }

    pub fn growth_slots(&self) -> usize {
        self.growth_slots
    }

    pub fn shrink_load_factor(&self) -> f64 {
        self.shrink_load_factor
    }

    pub fn grow_load_factor(&self) -> f64 {
        self.grow_load_factor
    }

    pub fn grow_shift(&self) -> u32 {
        self.grow_shift
    }

    pub fn shrink_floor(&self) -> usize {
        self.shrink_floor
    }

    /// Check every parameter, including that the initial buffer is addressable by
    /// 32-bit offsets.
    pub fn validate(&self) -> Result<(), FlatTableError> {
        if !self.initial_bucket_count.is_power_of_two() {
            return Err(FlatTableError::InvalidBucketCount(
                self.initial_bucket_count,
            ));
        }
        if self.growth_slots == 0 {
            return Err(FlatTableError::InvalidConfig(
                "growth_slots must be at least 1",
            ));
        }
        if self.grow_shift == 0 || self.grow_shift > MAX_GROW_SHIFT {
            return Err(FlatTableError::InvalidConfig(
                "grow_shift must be between 1 and 16",
            ));
        }
        if !self.shrink_load_factor.is_finite()
            || !self.grow_load_factor.is_finite()
            || self.shrink_load_factor < 0.0
            || self.grow_load_factor < 0.0
        {
            return Err(FlatTableError::InvalidConfig(
                "load factors must be finite and non-negative",
            ));
        }
        // A shrink halves the bucket count and with it the grow threshold, so the
        // shrunk table must still sit below that threshold.
        if self.shrink_load_factor * 2.0 >= self.grow_load_factor {
            return Err(FlatTableError::InvalidConfig(
                "shrink_load_factor must be below half of grow_load_factor",
            ));
        }
        initial_store_len(self.initial_bucket_count, self.bucket_slots)?;
        Ok(())
    }
}

// ================================================================================================
// BUILDER
// ================================================================================================

/// Builds a [`TableConfig`] (or directly a [`FlatHashTable`]) with various
/// configuration knobs.
///
/// # Examples
///
/// ```rust
/// use flattable_rs::FlatHashTable;
///
/// let mut table = FlatHashTable::builder()
///     // 64 buckets up front
///     .initial_bucket_count(64)
///     // 4 slots per bucket before the first splice
///     .bucket_slots(4)
///     .build()
///     .unwrap();
///
/// table.put(7, 70).unwrap();
/// assert_eq!(table.get(7), Some(70));
/// assert_eq!(table.bucket_count(), 64);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TableConfigBuilder {
    config: TableConfig,
}

impl TableConfigBuilder {
    /// Sets the directory size of the table. Must be a non-zero power of two.
    pub fn initial_bucket_count(self, bucket_count: usize) -> Self {
        Self {
            config: TableConfig {
                initial_bucket_count: bucket_count,
                ..self.config
            },
        }
    }

    /// Sets how many key/value slots each segment starts with. Zero is allowed and
    /// makes the first insert into every bucket splice.
    pub fn bucket_slots(self, slots: usize) -> Self {
        Self {
            config: TableConfig {
                bucket_slots: slots,
                ..self.config
            },
        }
    }

    /// Sets how many slots a full segment gains per splice.
    pub fn growth_slots(self, slots: usize) -> Self {
        Self {
            config: TableConfig {
                growth_slots: slots,
                ..self.config
            },
        }
    }

    pub fn shrink_load_factor(self, factor: f64) -> Self {
        Self {
            config: TableConfig {
                shrink_load_factor: factor,
                ..self.config
            },
        }
    }

    pub fn grow_load_factor(self, factor: f64) -> Self {
        Self {
            config: TableConfig {
                grow_load_factor: factor,
                ..self.config
            },
        }
    }

    pub fn grow_shift(self, shift: u32) -> Self {
        Self {
            config: TableConfig {
                grow_shift: shift,
                ..self.config
            },
        }
    }

    /// Tables holding `floor` pairs or fewer are never shrunk.
    pub fn shrink_floor(self, floor: usize) -> Self {
        Self {
            config: TableConfig {
                shrink_floor: floor,
                ..self.config
            },
        }
    }

    /// Validates and returns the configuration.
    pub fn build_config(self) -> Result<TableConfig, FlatTableError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Validates the configuration and creates an empty table from it.
    pub fn build(self) -> Result<FlatHashTable, FlatTableError> {
        FlatHashTable::with_config(self.config)
    }
}

// ================================================================================================
// LAYOUT HELPERS
// ================================================================================================

/// Words occupied by one segment: `slots` key/value pairs plus the end sentinel.
#[inline(always)]
pub(crate) fn segment_len(slots: usize) -> usize {
    2 * slots + 1
}

/// Length of a freshly laid out buffer: the directory plus one segment per bucket.
pub(crate) fn initial_store_len(
    bucket_count: usize,
    bucket_slots: usize,
) -> Result<usize, FlatTableError> {
    let requested = bucket_slots
        .checked_mul(2)
        .and_then(|words| words.checked_add(1))
        .and_then(|seg| seg.checked_mul(bucket_count))
        .and_then(|segments| segments.checked_add(bucket_count));
    match requested {
        Some(len) if len <= MAX_STORE_LEN => Ok(len),
        Some(len) => Err(FlatTableError::CapacityOverflow { requested: len }),
        None => Err(FlatTableError::CapacityOverflow {
            requested: usize::MAX,
        }),
    }
}
