use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use tracing::debug;

use crate::btree::PageStore;
use crate::error::StorageError;
use crate::storage::page::Page;
use crate::types::{PAGE_SIZE, PageId};

/// The sole arbiter of page allocation and page I/O for a database file.
///
/// Every page read or written stays in an unbounded in-process cache keyed
/// by page id; `flush_page` writes a cached buffer back to its file offset.
/// Reads of identifiers that were never allocated yield zeroed buffers,
/// which is how a fresh meta page is first observed. Page 0 is reserved for
/// the meta page and never handed out by the allocator.
pub struct Pager {
    file: File,
    cache: HashMap<PageId, [u8; PAGE_SIZE]>,
    /// Reuse pool consulted before extending the file. Nothing frees pages
    /// in this version, so it stays empty.
    free_list: Vec<PageId>,
    next_page_id: PageId,
}

impl Pager {
    /// Open (or create) the database file at `path`.
    ///
    /// An empty file is initialised with a zeroed meta page at offset 0 and
    /// allocation starting at page 1; otherwise the next allocation id is
    /// derived from the file length.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let len = file.metadata()?.len();
        let mut next_page_id = (len / PAGE_SIZE as u64) as PageId;
        if next_page_id == 0 {
            let meta = [0u8; PAGE_SIZE];
            file.write_all_at(&meta, 0)?;
            next_page_id = 1;
            debug!(path = %path.display(), "initialised fresh database file");
        } else {
            debug!(path = %path.display(), pages = next_page_id, "opened database file");
        }

        Ok(Self {
            file,
            cache: HashMap::new(),
            free_list: Vec::new(),
            next_page_id,
        })
    }

    /// Fsync the underlying file.
    pub fn sync(&self) -> Result<(), StorageError> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Number of pages the file holds (allocated so far).
    pub fn page_count(&self) -> PageId {
        self.next_page_id
    }

    fn read_from_disk(&self, page_id: PageId) -> Result<[u8; PAGE_SIZE], StorageError> {
        let mut buf = [0u8; PAGE_SIZE];
        let offset = page_id as u64 * PAGE_SIZE as u64;
        let mut filled = 0;
        while filled < PAGE_SIZE {
            let n = self.file.read_at(&mut buf[filled..], offset + filled as u64)?;
            if n == 0 {
                // Short read past EOF: the remainder stays zeroed.
                break;
            }
            filled += n;
        }
        Ok(buf)
    }
}

impl PageStore for Pager {
    fn read_page(&mut self, page_id: PageId) -> Result<Page, StorageError> {
        if let Some(buf) = self.cache.get(&page_id) {
            return Ok(Page::from_bytes(*buf));
        }
        let buf = self.read_from_disk(page_id)?;
        self.cache.insert(page_id, buf);
        Ok(Page::from_bytes(buf))
    }

    fn write_page(&mut self, page: Page) -> Result<(), StorageError> {
        self.cache.insert(page.page_id(), *page.data());
        Ok(())
    }

    fn allocate_page(&mut self) -> Result<Page, StorageError> {
        let page_id = match self.free_list.pop() {
            Some(id) => id,
            None => {
                let id = self.next_page_id;
                self.next_page_id += 1;
                id
            }
        };
        let page = Page::new(page_id);
        self.cache.insert(page_id, *page.data());
        self.file
            .write_all_at(page.data(), page_id as u64 * PAGE_SIZE as u64)?;
        Ok(page)
    }

    fn flush_page(&mut self, page_id: PageId) -> Result<(), StorageError> {
        if let Some(buf) = self.cache.get(&page_id) {
            self.file
                .write_all_at(buf, page_id as u64 * PAGE_SIZE as u64)?;
        }
        Ok(())
    }
}
