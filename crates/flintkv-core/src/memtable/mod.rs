//! In-memory ordered map with tombstone deletes and ordered file flush.
//!
//! The memtable shares the engine's key-value contract but lives entirely in
//! memory: deletes are recorded as tombstone markers rather than removing
//! the entry, so a flushed file can shadow older values in an earlier file.
//! [`compact`](crate::memtable::compact::compact) merges two flushed files,
//! eliminating shadowed records and tombstones.

pub mod compact;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Bound;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::Result;
use crate::types::KeyValuePair;

/// Reserved value marking a key as deleted in flushed files.
pub const TOMBSTONE: &[u8] = b"<<TOMBSTONE_MARKER>>";

/// A row produced by [`Memtable::join`]: a key live in both maps together
/// with the value from each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedPair {
    pub key: Vec<u8>,
    pub left: Vec<u8>,
    pub right: Vec<u8>,
}

/// An ordered, in-memory key-value map.
///
/// Entries map keys to `Option<Vec<u8>>`: `Some(bytes)` is a live value,
/// `None` a tombstone. Tombstones shadow the key until a compaction drops
/// them. Key and value lengths are bounded by the flush record format's
/// 16-bit length prefixes.
#[derive(Debug, Default)]
pub struct Memtable {
    map: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl Memtable {
    /// Create a new, empty memtable.
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Insert or replace a key.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.map.insert(key, Some(value));
    }

    /// Record a tombstone for `key`, shadowing any existing value.
    pub fn remove(&mut self, key: Vec<u8>) {
        self.map.insert(key, None);
    }

    /// The value for `key`, if it exists and is not a tombstone.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.map.get(key).and_then(|entry| entry.as_deref())
    }

    /// Number of entries, tombstones included.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// `true` if the memtable holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over all entries in ascending key order, tombstones included.
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Option<Vec<u8>>)> {
        self.map.iter()
    }

    /// Collect live `(key, value)` pairs with `low <= key <= high` in
    /// ascending key order. Tombstoned keys are skipped.
    pub fn range_scan(&self, low: &[u8], high: &[u8]) -> Vec<KeyValuePair> {
        if low > high {
            return Vec::new();
        }
        self.map
            .range::<[u8], _>((Bound::Included(low), Bound::Included(high)))
            .filter_map(|(key, entry)| {
                entry
                    .as_ref()
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect()
    }

    /// Join this map with `other` over the key range `low..=high`.
    ///
    /// Live keys in the range are probed against `other` with a point
    /// lookup; a row is produced only when the key is live on both sides.
    /// Output follows the range scan, so it is ascending by key.
    pub fn join(&self, other: &Memtable, low: &[u8], high: &[u8]) -> Vec<JoinedPair> {
        self.range_scan(low, high)
            .into_iter()
            .filter_map(|(key, left)| {
                let right = other.get(&key)?.to_vec();
                Some(JoinedPair { key, left, right })
            })
            .collect()
    }

    /// Serialize every entry to `path` in ascending key order.
    ///
    /// Records are `[kLen:u16 LE][key][vLen:u16 LE][value]`; a tombstone is
    /// written with the reserved [`TOMBSTONE`] byte string as its value, so
    /// a later compaction can recognise and drop it.
    pub fn flush(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for (key, entry) in &self.map {
            let value: &[u8] = match entry {
                Some(value) => value,
                None => TOMBSTONE,
            };
            out.write_u16::<LittleEndian>(key.len() as u16)?;
            out.write_all(key)?;
            out.write_u16::<LittleEndian>(value.len() as u16)?;
            out.write_all(value)?;
        }
        out.flush()?;
        Ok(())
    }
}
