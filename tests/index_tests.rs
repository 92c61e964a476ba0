//! Tests for the B+ tree index
//!
//! These tests verify:
//! - Search/insert/delete behavior over integer keys
//! - Structural invariants (sorted keys, separator bounds, occupancy)
//!   after every mutation
//! - Split propagation and root growth under sustained inserts
//! - Borrow/merge rebalancing and root collapse under sustained deletes
//! - Ordered iteration over the leaf chain

use tabula::index::BPlusTree;

// =============================================================================
// Helper Functions
// =============================================================================

/// Deterministic permutation of 0..n (n prime, step coprime to n)
fn permuted_keys(n: i64, step: i64) -> Vec<i64> {
    (0..n).map(|i| (i * step) % n).collect()
}

fn assert_valid(tree: &BPlusTree) {
    if let Err(e) = tree.validate() {
        panic!("tree invariant violated: {}", e);
    }
}

// =============================================================================
// Search Tests
// =============================================================================

#[test]
fn test_empty_tree_search() {
    let tree = BPlusTree::new();
    assert_eq!(tree.search(42), None);
    assert!(tree.is_empty());
    assert_valid(&tree);
}

#[test]
fn test_insert_and_search_single() {
    let mut tree = BPlusTree::new();
    tree.insert(7, 100);

    assert_eq!(tree.search(7), Some(100));
    assert_eq!(tree.search(8), None);
    assert_eq!(tree.len(), 1);
    assert_valid(&tree);
}

#[test]
fn test_search_returns_matching_offset() {
    let mut tree = BPlusTree::new();
    for key in 0..20 {
        tree.insert(key, (key as u64) * 10);
    }

    for key in 0..20 {
        assert_eq!(tree.search(key), Some((key as u64) * 10));
    }
    assert_eq!(tree.search(20), None);
    assert_eq!(tree.search(-1), None);
}

// =============================================================================
// Insertion Tests
// =============================================================================

#[test]
fn test_insert_ascending_keeps_invariants() {
    let mut tree = BPlusTree::new();
    for key in 0..200 {
        tree.insert(key, key as u64);
        assert_valid(&tree);
    }
    assert_eq!(tree.len(), 200);
    for key in 0..200 {
        assert_eq!(tree.search(key), Some(key as u64));
    }
}

#[test]
fn test_insert_descending_keeps_invariants() {
    let mut tree = BPlusTree::new();
    for key in (0..200).rev() {
        tree.insert(key, key as u64);
        assert_valid(&tree);
    }
    for key in 0..200 {
        assert_eq!(tree.search(key), Some(key as u64));
    }
}

#[test]
fn test_insert_permuted_keeps_invariants() {
    let mut tree = BPlusTree::new();
    for key in permuted_keys(211, 89) {
        tree.insert(key, key as u64 + 1);
        assert_valid(&tree);
    }
    assert_eq!(tree.len(), 211);
    for key in 0..211 {
        assert_eq!(tree.search(key), Some(key as u64 + 1));
    }
}

#[test]
fn test_insert_negative_keys() {
    let mut tree = BPlusTree::new();
    for key in -50..50 {
        tree.insert(key, (key + 50) as u64);
    }
    assert_valid(&tree);
    assert_eq!(tree.search(-50), Some(0));
    assert_eq!(tree.search(49), Some(99));
}

// =============================================================================
// Deletion Tests
// =============================================================================

#[test]
fn test_delete_missing_key() {
    let mut tree = BPlusTree::new();
    tree.insert(1, 1);

    assert!(!tree.delete(2));
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.search(1), Some(1));
}

#[test]
fn test_delete_from_leaf_root() {
    let mut tree = BPlusTree::new();
    tree.insert(1, 10);
    tree.insert(2, 20);

    assert!(tree.delete(1));
    assert_eq!(tree.search(1), None);
    assert_eq!(tree.search(2), Some(20));
    assert_valid(&tree);
}

#[test]
fn test_delete_until_empty() {
    let mut tree = BPlusTree::new();
    for key in 0..100 {
        tree.insert(key, key as u64);
    }
    for key in 0..100 {
        assert!(tree.delete(key));
        assert_valid(&tree);
    }
    assert!(tree.is_empty());
    assert_eq!(tree.search(50), None);

    // An emptied tree keeps working.
    tree.insert(5, 55);
    assert_eq!(tree.search(5), Some(55));
    assert_valid(&tree);
}

#[test]
fn test_delete_reverse_order_keeps_invariants() {
    let mut tree = BPlusTree::new();
    for key in 0..150 {
        tree.insert(key, key as u64);
    }
    for key in (0..150).rev() {
        assert!(tree.delete(key));
        assert_valid(&tree);
    }
    assert!(tree.is_empty());
}

#[test]
fn test_delete_permuted_keeps_invariants() {
    let mut tree = BPlusTree::new();
    for key in 0..211 {
        tree.insert(key, key as u64);
    }
    for key in permuted_keys(211, 101) {
        assert!(tree.delete(key));
        assert_valid(&tree);
    }
    assert!(tree.is_empty());
}

#[test]
fn test_delete_half_leaves_rest_searchable() {
    let mut tree = BPlusTree::new();
    for key in 0..100 {
        tree.insert(key, key as u64);
    }
    for key in (0..100).filter(|k| k % 2 == 0) {
        assert!(tree.delete(key));
        assert_valid(&tree);
    }
    for key in 0..100 {
        if key % 2 == 0 {
            assert_eq!(tree.search(key), None);
        } else {
            assert_eq!(tree.search(key), Some(key as u64));
        }
    }
    assert_eq!(tree.len(), 50);
}

#[test]
fn test_interleaved_insert_delete() {
    let mut tree = BPlusTree::new();
    for round in 0..10i64 {
        for key in 0..40 {
            tree.insert(round * 40 + key, key as u64);
            assert_valid(&tree);
        }
        // Drop most of the round, keeping every fourth key.
        for key in 0..40 {
            if key % 4 != 0 {
                assert!(tree.delete(round * 40 + key));
                assert_valid(&tree);
            }
        }
    }
    assert_eq!(tree.len(), 100);
    assert_eq!(tree.search(0), Some(0));
    assert_eq!(tree.search(1), None);
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_iter_empty() {
    let tree = BPlusTree::new();
    assert_eq!(tree.iter().count(), 0);
}

#[test]
fn test_iter_yields_sorted_pairs() {
    let mut tree = BPlusTree::new();
    for key in permuted_keys(97, 35) {
        tree.insert(key, key as u64 * 2);
    }

    let pairs: Vec<(i64, u64)> = tree.iter().collect();
    assert_eq!(pairs.len(), 97);
    for (i, &(key, offset)) in pairs.iter().enumerate() {
        assert_eq!(key, i as i64);
        assert_eq!(offset, key as u64 * 2);
    }
}

#[test]
fn test_iter_after_deletions() {
    let mut tree = BPlusTree::new();
    for key in 0..50 {
        tree.insert(key, key as u64);
    }
    for key in 10..40 {
        tree.delete(key);
    }

    let keys: Vec<i64> = tree.iter().map(|(k, _)| k).collect();
    let expected: Vec<i64> = (0..10).chain(40..50).collect();
    assert_eq!(keys, expected);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_clear_resets_tree() {
    let mut tree = BPlusTree::new();
    for key in 0..100 {
        tree.insert(key, key as u64);
    }

    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.search(10), None);
    assert_valid(&tree);

    tree.insert(10, 1);
    assert_eq!(tree.search(10), Some(1));
}
