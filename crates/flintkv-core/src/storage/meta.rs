//! The meta page: page 0, whose first four bytes store the little-endian
//! page id of the current B+Tree root. The remainder of the page is reserved
//! and stays zero.

use crate::storage::page::Page;
use crate::types::PageId;

/// The reserved meta page identifier. Never handed out by the allocator.
pub const META_PAGE_ID: PageId = 0;

/// Read the root page id from a meta page buffer.
pub fn root_id(page: &Page) -> PageId {
    u32::from_le_bytes(page.data()[0..4].try_into().unwrap())
}

/// Write the root page id into a meta page buffer.
pub fn set_root_id(page: &mut Page, root: PageId) {
    page.data_mut()[0..4].copy_from_slice(&root.to_le_bytes());
}
