use crate::btree::{BPlusTree, PageStore};
use crate::error::Result;
use crate::types::{KeyValuePair, MAX_KEY_SIZE};

/// Predicate applied to each `(key, value)` pair during [`execute`].
///
/// [`execute`]: QueryBuilder::execute
pub type Predicate = Box<dyn Fn(&[u8], &[u8]) -> bool>;

/// Builder for filtered, bounded range queries over the tree.
///
/// Defaults scan the whole keyspace in ascending order with no limit:
///
/// ```no_run
/// # use flintkv_core::api::FlintKV;
/// # let mut db = FlintKV::open("db.bin").unwrap();
/// let first_three = db
///     .query()
///     .range(b"user_".to_vec(), b"user_~".to_vec())
///     .filter(|_key, value| !value.is_empty())
///     .descending()
///     .limit(3)
///     .execute()
///     .unwrap();
/// ```
pub struct QueryBuilder<'a, S: PageStore> {
    tree: &'a mut BPlusTree<S>,
    start: Vec<u8>,
    end: Vec<u8>,
    limit: Option<usize>,
    descending: bool,
    filters: Vec<Predicate>,
}

impl<'a, S: PageStore> QueryBuilder<'a, S> {
    pub(crate) fn new(tree: &'a mut BPlusTree<S>) -> Self {
        Self {
            tree,
            start: Vec::new(),
            end: vec![0xff; MAX_KEY_SIZE],
            limit: None,
            descending: false,
            filters: Vec::new(),
        }
    }

    /// Restrict the scan to `start..=end`.
    pub fn range(mut self, start: impl Into<Vec<u8>>, end: impl Into<Vec<u8>>) -> Self {
        self.start = start.into();
        self.end = end.into();
        self
    }

    /// Keep only pairs for which `predicate` returns `true`.
    pub fn filter(mut self, predicate: impl Fn(&[u8], &[u8]) -> bool + 'static) -> Self {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Cap the number of returned pairs.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Reverse the output order. The underlying scan stays ascending; the
    /// limit applies after the reversal.
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// Run the scan and apply filters, ordering, and limit, in that order.
    pub fn execute(self) -> Result<Vec<KeyValuePair>> {
        let mut results = self.tree.range_scan(&self.start, &self.end)?;
        if !self.filters.is_empty() {
            results.retain(|(key, value)| self.filters.iter().all(|f| f(key, value)));
        }
        if self.descending {
            results.reverse();
        }
        if let Some(n) = self.limit {
            results.truncate(n);
        }
        Ok(results)
    }
}
