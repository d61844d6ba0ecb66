#![allow(dead_code)]

use flattable_rs::{FlatHashTable, BUCKET_END, EMPTY};

/// Walk the raw buffer and check every layout invariant the table relies on.
pub fn assert_layout(table: &FlatHashTable) {
    let (store, bucket_count) = table.raw_view();
    assert!(bucket_count.is_power_of_two());
    assert_eq!(bucket_count, table.bucket_count());
    assert_eq!(
        store[0] as usize, bucket_count,
        "first segment must start right after the directory"
    );

    let mut live = 0;
    for bucket in 0..bucket_count {
        let start = store[bucket] as usize;
        let end = if bucket + 1 < bucket_count {
            store[bucket + 1] as usize
        } else {
            store.len()
        };
        assert!(start >= bucket_count, "bucket {bucket} points into the directory");
        assert!(end > start, "segments out of order at bucket {bucket}");
        assert_eq!((end - start) % 2, 1, "bucket {bucket} is not pairs + sentinel");
        assert_eq!(store[end - 1], BUCKET_END, "bucket {bucket} lost its end sentinel");

        let mut seen_empty = false;
        for slot in (start..end - 1).step_by(2) {
            let key = store[slot];
            assert_ne!(key, BUCKET_END, "stray end sentinel inside bucket {bucket}");
            if key == EMPTY {
                seen_empty = true;
            } else {
                assert!(!seen_empty, "live pair after a gap in bucket {bucket}");
                assert_eq!(table.bucket_index(key), bucket, "key {key} in wrong bucket");
                live += 1;
            }
        }
    }
    assert_eq!(live, table.len());
    assert!(table.capacity() >= table.len());
}

/// First `n` keys that land in `bucket` for `table`'s current bucket count,
/// skipping anything in `exclude`.
pub fn colliding_keys(table: &FlatHashTable, bucket: usize, n: usize, exclude: &[u32]) -> Vec<u32> {
    (0u32..)
        .filter(|k| table.bucket_index(*k) == bucket && !exclude.contains(k))
        .take(n)
        .collect()
}

/// Offset of `bucket`'s segment, read from the directory.
pub fn segment_start(table: &FlatHashTable, bucket: usize) -> usize {
    let (store, _) = table.raw_view();
    store[bucket] as usize
}
