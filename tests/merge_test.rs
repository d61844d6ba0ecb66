mod common;

use common::assert_layout;
use flattable_rs::{FlatHashTable, FlatTableError};

#[test]
fn test_add_accumulates() {
    let mut t = FlatHashTable::new();
    t.put(4, 5).unwrap();
    assert_eq!(t.add(4, 3).unwrap(), 8);
    assert_eq!(t.get(4), Some(8));
    assert_eq!(t.len(), 1);

    // absent key starts from the given value
    assert_eq!(t.add(6, 3).unwrap(), 3);
    assert_eq!(t.get(6), Some(3));
    assert_eq!(t.len(), 2);
}

#[test]
fn test_add_wraps_on_overflow() {
    let mut t = FlatHashTable::new();
    t.put(1, u32::MAX - 1).unwrap();
    assert_eq!(t.add(1, 3).unwrap(), 1);
    assert_eq!(t.get(1), Some(1));
}

#[test]
fn test_update_max() {
    let mut t = FlatHashTable::new();
    t.put(4, 5).unwrap();
    assert_eq!(t.update_max(4, 2).unwrap(), 5);
    assert_eq!(t.get(4), Some(5));
    assert_eq!(t.update_max(4, 7).unwrap(), 7);
    assert_eq!(t.get(4), Some(7));

    assert_eq!(t.update_max(9, 9).unwrap(), 9);
    assert_eq!(t.get(9), Some(9));
    assert_eq!(t.len(), 2);
}

#[test]
fn test_counting_with_add() {
    let mut t = FlatHashTable::new();
    let words = [3u32, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5];
    for w in words {
        t.add(w, 1).unwrap();
    }
    assert_eq!(t.get(5), Some(3));
    assert_eq!(t.get(1), Some(2));
    assert_eq!(t.get(3), Some(2));
    assert_eq!(t.get(9), Some(1));
    assert_eq!(t.len(), 7);
    assert_eq!(t.values().map(|v| v as usize).sum::<usize>(), words.len());
    assert_layout(&t);
}

#[test]
fn test_get_index_put_index() {
    let mut t = FlatHashTable::new();
    t.put(1, 10).unwrap();

    let index = t.get_index(1).unwrap();
    assert!(index >= t.bucket_count());
    assert_eq!(t.raw_view().0[index], 1);
    assert_eq!(t.raw_view().0[index + 1], 10);

    t.put_index(index, 99).unwrap();
    assert_eq!(t.get(1), Some(99));
    assert_eq!(t.get_index(2), None);
}

#[test]
fn test_put_index_rejects_non_key_words() {
    let mut t = FlatHashTable::new();
    t.put(1, 10).unwrap();
    // bucket 1 starts at 2 + 5
    let index = t.get_index(1).unwrap();
    assert_eq!(index, 7);

    for bad in [0, 1, index + 1, index + 2, index + 4, 12, usize::MAX - 1] {
        assert_eq!(t.put_index(bad, 5), Err(FlatTableError::InvalidSlot(bad)), "{bad}");
    }
    assert_eq!(t.get(1), Some(10));
    assert_layout(&t);
}
