use std::path::Path;

use tracing::debug;

use crate::btree::BPlusTree;
use crate::error::Result;
use crate::storage::pager::Pager;
use crate::types::KeyValuePair;

use super::query::QueryBuilder;

/// The main database handle: a slotted-page B+Tree over a single file.
///
/// The handle assumes exclusive access to the backing file for the lifetime
/// of the process. Every mutating call persists the pages it touched before
/// returning; [`sync`](FlintKV::sync) additionally forces an fsync of the
/// whole file.
pub struct FlintKV {
    tree: BPlusTree<Pager>,
}

impl FlintKV {
    /// Open (or create) a database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pager = Pager::open(path)?;
        let tree = BPlusTree::open(pager)?;
        debug!(path = %path.display(), "database opened");
        Ok(Self { tree })
    }

    /// Insert `key`, replacing any existing value for it.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.tree.put(key, value)
    }

    /// Point lookup. Returns `None` for unknown keys.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.tree.get(key)
    }

    /// Delete `key`. Returns `false` when the key is absent.
    pub fn remove(&mut self, key: &[u8]) -> Result<bool> {
        self.tree.remove(key)
    }

    /// Ascending scan of `low..=high`.
    pub fn scan(&mut self, low: &[u8], high: &[u8]) -> Result<Vec<KeyValuePair>> {
        self.tree.range_scan(low, high)
    }

    /// Start building a filtered, bounded range query.
    pub fn query(&mut self) -> QueryBuilder<'_, Pager> {
        QueryBuilder::new(&mut self.tree)
    }

    /// Fsync the backing file.
    pub fn sync(&self) -> Result<()> {
        self.tree.store().sync()?;
        Ok(())
    }
}
