//! # FlintKV
//!
//! A single-file, embedded, ordered key-value storage engine written in Rust.
//!
//! FlintKV stores `(key, value)` byte pairs in a slotted-page B+Tree backed by
//! a single file. A caching pager mediates every page access; leaves are
//! chained in key order so bounded range scans walk siblings without
//! re-descending the tree. An auxiliary in-memory ordered map
//! ([`memtable::Memtable`]) shares the same key-value contract and adds
//! tombstone deletes, ordered file flush, and merge-style file compaction.
//!
//! ## Quick Start
//!
//! ```no_run
//! use flintkv_core::api::FlintKV;
//!
//! // Create or open a database file
//! let mut db = FlintKV::open("my_database.db").unwrap();
//!
//! db.put(b"apple", b"red").unwrap();
//! db.put(b"banana", b"yellow").unwrap();
//!
//! assert_eq!(db.get(b"apple").unwrap().as_deref(), Some(&b"red"[..]));
//!
//! // Bounded, filtered range query
//! let ripe = db
//!     .query()
//!     .range(b"a".to_vec(), b"c".to_vec())
//!     .filter(|_key, value| !value.is_empty())
//!     .limit(10)
//!     .execute()
//!     .unwrap();
//! assert_eq!(ripe.len(), 2);
//! ```

pub mod api;
pub mod btree;
pub mod error;
pub mod memtable;
pub mod storage;
pub mod types;
