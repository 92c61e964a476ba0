//! Index Module
//!
//! In-memory B+ tree mapping integer primary keys to byte offsets in a
//! table's data file.
//!
//! ## Responsibilities
//! - Resolve a primary key to a file offset in O(log n)
//! - Keep keys sorted under arbitrary insert/delete sequences
//! - Chain leaves left-to-right for ordered scans
//!
//! ## Representation
//! Nodes live in an arena (a flat `Vec` addressed by stable indices) rather
//! than a pointer graph; parent, child, and next-leaf relations are index
//! fields, so splits and merges never chase or invalidate pointers.
//!
//! The index performs no I/O and no locking: every call happens under the
//! owning table's lock.

mod node;
mod tree;

pub use tree::{BPlusTree, Iter, MAX_KEYS, MIN_KEYS};
