//! Core B+Tree operations: root bootstrap, search, insert with node splits,
//! delete, and sibling-chain range scans.
//!
//! Writes go bottom-up: a full leaf splits and promotes its separator into
//! the parent through the child's `parent_id` pointer; a full internal node
//! splits the same way, recursing toward the root. Every mutating operation
//! ends by flushing the pages it touched, and root changes rewrite the meta
//! page.

use tracing::{debug, warn};

use crate::error::{Result, StorageError, TreeError};
use crate::storage::meta::{self, META_PAGE_ID};
use crate::storage::page::Page;
use crate::storage::slotted;
use crate::types::{
    KeyValuePair, MAX_KEY_SIZE, MAX_RECORD_SIZE, PAGE_HEADER_SIZE, PageId, SLOT_SIZE,
};

use super::{PageStore, node};

/// An ordered map of byte keys to byte values over slotted pages from a
/// [`PageStore`].
pub struct BPlusTree<S: PageStore> {
    store: S,
    root: PageId,
}

impl<S: PageStore> BPlusTree<S> {
    /// Open the tree over `store`.
    ///
    /// Reads the root pointer from the meta page; a zero root means a fresh
    /// file, in which case a leaf root is allocated and the meta page
    /// rewritten.
    pub fn open(mut store: S) -> Result<Self> {
        let meta_page = store.read_page(META_PAGE_ID)?;
        let mut root = meta::root_id(&meta_page);
        if root == 0 {
            let mut page = store.allocate_page()?;
            root = page.page_id();
            page.set_is_leaf(true);
            store.write_page(page)?;
            store.flush_page(root)?;

            let mut meta_page = store.read_page(META_PAGE_ID)?;
            meta::set_root_id(&mut meta_page, root);
            store.write_page(meta_page)?;
            store.flush_page(META_PAGE_ID)?;
            debug!(root, "bootstrapped empty tree");
        }
        Ok(Self { store, root })
    }

    /// The current root page id.
    pub fn root(&self) -> PageId {
        self.root
    }

    /// The underlying page store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Insert `key`, replacing any existing value for it.
    ///
    /// Keys longer than [`MAX_KEY_SIZE`] are refused; records larger than
    /// [`MAX_RECORD_SIZE`] are reported and dropped without error.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.len() > MAX_KEY_SIZE {
            return Err(TreeError::KeyTooLarge {
                max: MAX_KEY_SIZE,
                actual: key.len(),
            }
            .into());
        }
        let record = slotted::record_size(key, value);
        if record > MAX_RECORD_SIZE {
            warn!(size = record, max = MAX_RECORD_SIZE, "record too large, dropped");
            return Ok(());
        }

        let leaf_id = self.find_leaf(key)?;
        let mut leaf = self.store.read_page(leaf_id)?;

        // Replace semantics: drop the old record, then insert as new. The
        // new value may be larger than the old one, so the insert below may
        // still split.
        if let Ok(idx) = slotted::binary_search(&leaf, key) {
            slotted::remove_at(&mut leaf, idx);
            slotted::defragment(&mut leaf);
        }

        let needed = PAGE_HEADER_SIZE + (leaf.num_slots() as usize + 1) * SLOT_SIZE + record;
        if (leaf.free_space_offset() as usize) < needed {
            self.split_leaf(leaf, key, value)
        } else {
            let idx = match slotted::binary_search(&leaf, key) {
                Ok(i) | Err(i) => i,
            };
            slotted::insert_at(&mut leaf, idx, key, value)?;
            self.store.write_page(leaf)?;
            self.store.flush_page(leaf_id)?;
            Ok(())
        }
    }

    /// Look up `key`, returning a copy of its value.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let leaf_id = self.find_leaf(key)?;
        let leaf = self.store.read_page(leaf_id)?;
        match slotted::binary_search(&leaf, key) {
            Ok(idx) => {
                let (_, value) = slotted::record_at(&leaf, idx);
                Ok(Some(value.to_vec()))
            }
            Err(_) => Ok(None),
        }
    }

    /// Delete `key`, returning `false` when it is absent.
    ///
    /// No rebalancing: leaves may become (and stay) empty, and separator
    /// keys in ancestors are left untouched. Descent never stops at an
    /// internal node, so searches keep working.
    pub fn remove(&mut self, key: &[u8]) -> Result<bool> {
        let leaf_id = self.find_leaf(key)?;
        let mut leaf = self.store.read_page(leaf_id)?;
        match slotted::binary_search(&leaf, key) {
            Err(_) => Ok(false),
            Ok(idx) => {
                slotted::remove_at(&mut leaf, idx);
                slotted::defragment(&mut leaf);
                self.store.write_page(leaf)?;
                self.store.flush_page(leaf_id)?;
                Ok(true)
            }
        }
    }

    /// Collect `(key, value)` pairs with `low <= key <= high` in ascending
    /// key order, walking the leaf sibling chain.
    pub fn range_scan(&mut self, low: &[u8], high: &[u8]) -> Result<Vec<KeyValuePair>> {
        let mut out = Vec::new();
        if low > high {
            return Ok(out);
        }

        let mut current = self.find_leaf(low)?;
        let mut leaf = self.store.read_page(current)?;
        let mut start = match slotted::binary_search(&leaf, low) {
            Ok(i) | Err(i) => i,
        };
        loop {
            for idx in start..leaf.num_slots() as usize {
                let (key, value) = slotted::record_at(&leaf, idx);
                if key > high {
                    return Ok(out);
                }
                out.push((key.to_vec(), value.to_vec()));
            }
            current = leaf.next_sibling();
            if current == 0 {
                return Ok(out);
            }
            leaf = self.store.read_page(current)?;
            start = 0;
        }
    }

    /// Descend from the root to the leaf responsible for `key`.
    fn find_leaf(&mut self, key: &[u8]) -> Result<PageId> {
        let mut current = self.root;
        loop {
            let page = self.store.read_page(current)?;
            if page.is_leaf() {
                return Ok(current);
            }
            current = node::find_child(&page, key);
            if current == 0 {
                return Err(StorageError::CorruptedPage(
                    "descent reached a null child pointer".to_string(),
                )
                .into());
            }
        }
    }

    /// Split a full leaf and insert the pending record into the correct
    /// half, then promote the separator into the parent.
    fn split_leaf(&mut self, mut old: Page, key: &[u8], value: &[u8]) -> Result<()> {
        let old_id = old.page_id();
        let parent_id = old.parent_id();

        let mut new = self.store.allocate_page()?;
        let new_id = new.page_id();
        new.set_is_leaf(true);
        new.set_parent_id(parent_id);

        // Splice the new leaf into the sibling chain.
        new.set_next_sibling(old.next_sibling());
        old.set_next_sibling(new_id);

        let count = old.num_slots() as usize;
        let mid = count / 2;
        // The first key that moves right becomes the promoted separator.
        let separator = slotted::key_at(&old, mid).to_vec();

        // Records are already in key order, so each re-insert appends.
        for idx in mid..count {
            let (k, v) = slotted::record_at(&old, idx);
            slotted::insert_at(&mut new, idx - mid, k, v)?;
        }
        old.set_num_slots(mid as u32);
        slotted::defragment(&mut old);

        // Route the pending record to the half its key sorts into.
        let target = if key < separator.as_slice() {
            &mut old
        } else {
            &mut new
        };
        let idx = match slotted::binary_search(target, key) {
            Ok(i) | Err(i) => i,
        };
        slotted::insert_at(target, idx, key, value)?;

        debug!(leaf = old_id, new_leaf = new_id, "split leaf");

        self.store.write_page(old)?;
        self.store.flush_page(old_id)?;
        self.store.write_page(new)?;
        self.store.flush_page(new_id)?;

        if old_id == self.root {
            self.create_new_root(old_id, new_id, &separator)
        } else {
            self.insert_into_internal(parent_id, &separator, new_id)
        }
    }

    /// Insert `(key, child_id)` into the internal node `node_id`, keeping
    /// index entries in ascending key order. A full node splits first, and
    /// the pending entry is routed to whichever half its key sorts into.
    fn insert_into_internal(&mut self, node_id: PageId, key: &[u8], child_id: PageId) -> Result<()> {
        let mut page = self.store.read_page(node_id)?;
        if page.num_slots() as usize >= node::capacity() {
            let (separator, new_id) = self.split_internal(page)?;
            let target = if key < separator.as_slice() {
                node_id
            } else {
                new_id
            };
            return self.insert_into_internal(target, key, child_id);
        }

        node::insert_entry(&mut page, key, child_id);
        self.store.write_page(page)?;
        self.store.flush_page(node_id)?;
        // The child may have inherited a parent pointer from before the
        // routing decision; repoint it at the node that actually holds it.
        self.reparent(child_id, node_id)
    }

    /// Split a full internal node, promoting the median separator one level
    /// up. Returns the promoted key and the new right node.
    fn split_internal(&mut self, mut old: Page) -> Result<(Vec<u8>, PageId)> {
        let old_id = old.page_id();
        let parent_id = old.parent_id();

        let mut new = self.store.allocate_page()?;
        let new_id = new.page_id();
        new.set_is_leaf(false);
        new.set_parent_id(parent_id);

        let count = old.num_slots() as usize;
        let mid = count / 2;
        // The median entry is promoted: its key moves up a level and its
        // child seeds the new node's lower bound.
        let separator = node::key_at(&old, mid).to_vec();
        let moved = node::child_at(&old, mid);
        new.set_lower_bound_child(moved);
        self.reparent(moved, new_id)?;

        // Entries above the median move wholesale and stay sorted.
        for idx in mid + 1..count {
            node::copy_entry(&old, idx, &mut new, idx - mid - 1);
            self.reparent(node::child_at(&old, idx), new_id)?;
        }
        new.set_num_slots((count - mid - 1) as u32);
        old.set_num_slots(mid as u32);

        debug!(node = old_id, new_node = new_id, "split internal node");

        self.store.write_page(old)?;
        self.store.flush_page(old_id)?;
        self.store.write_page(new)?;
        self.store.flush_page(new_id)?;

        if old_id == self.root {
            self.create_new_root(old_id, new_id, &separator)?;
        } else {
            self.insert_into_internal(parent_id, &separator, new_id)?;
        }
        Ok((separator, new_id))
    }

    /// Grow the tree by one level: a fresh internal root with `left` as the
    /// lower bound child and a single `(separator, right)` entry.
    fn create_new_root(&mut self, left_id: PageId, right_id: PageId, separator: &[u8]) -> Result<()> {
        let mut root = self.store.allocate_page()?;
        let root_id = root.page_id();
        root.set_is_leaf(false);
        root.set_lower_bound_child(left_id);
        node::write_entry(&mut root, 0, separator, right_id);
        root.set_num_slots(1);
        self.store.write_page(root)?;
        self.store.flush_page(root_id)?;

        self.reparent(left_id, root_id)?;
        self.reparent(right_id, root_id)?;

        self.root = root_id;
        let mut meta_page = self.store.read_page(META_PAGE_ID)?;
        meta::set_root_id(&mut meta_page, root_id);
        self.store.write_page(meta_page)?;
        self.store.flush_page(META_PAGE_ID)?;
        debug!(root = root_id, "created new root");
        Ok(())
    }

    /// Point `child_id` at `parent_id`, flushing immediately so later reads
    /// of the child never see a stale parent.
    fn reparent(&mut self, child_id: PageId, parent_id: PageId) -> Result<()> {
        let mut child = self.store.read_page(child_id)?;
        if child.parent_id() != parent_id {
            child.set_parent_id(parent_id);
            self.store.write_page(child)?;
            self.store.flush_page(child_id)?;
        }
        Ok(())
    }
}
