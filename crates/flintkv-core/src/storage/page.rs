use crate::types::{PAGE_SIZE, PageId};

/// A fixed-size page backed by a `[u8; PAGE_SIZE]` buffer.
///
/// Packed little-endian header layout (first 25 bytes):
/// ```text
/// [0..4]   page_id: u32
/// [4..8]   parent_id: u32 (0 = none)
/// [8..12]  next_sibling: u32 (0 = none; leaves only)
/// [12..16] lower_bound_child: u32 (internal nodes only)
/// [16]     is_leaf: u8 (0 or 1)
/// [17..21] num_slots: u32
/// [21..25] free_space_offset: u32
/// ```
///
/// The header is followed by the slot directory (leaves) or the index-entry
/// array (internal nodes); the record heap of a leaf grows downward from the
/// end of the buffer toward `free_space_offset`.
#[derive(Clone)]
pub struct Page {
    buf: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a fresh page with `page_id` and `free_space_offset` initialised.
    pub fn new(page_id: PageId) -> Self {
        let mut page = Self {
            buf: [0u8; PAGE_SIZE],
        };
        page.set_page_id(page_id);
        page.set_free_space_offset(PAGE_SIZE as u32);
        page
    }

    /// Wrap an existing raw page buffer.
    pub fn from_bytes(buf: [u8; PAGE_SIZE]) -> Self {
        Self { buf }
    }

    fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes(self.buf[offset..offset + 4].try_into().unwrap())
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn page_id(&self) -> PageId {
        self.read_u32(0)
    }

    pub fn set_page_id(&mut self, page_id: PageId) {
        self.write_u32(0, page_id);
    }

    pub fn parent_id(&self) -> PageId {
        self.read_u32(4)
    }

    pub fn set_parent_id(&mut self, parent_id: PageId) {
        self.write_u32(4, parent_id);
    }

    pub fn next_sibling(&self) -> PageId {
        self.read_u32(8)
    }

    pub fn set_next_sibling(&mut self, sibling: PageId) {
        self.write_u32(8, sibling);
    }

    pub fn lower_bound_child(&self) -> PageId {
        self.read_u32(12)
    }

    pub fn set_lower_bound_child(&mut self, child: PageId) {
        self.write_u32(12, child);
    }

    pub fn is_leaf(&self) -> bool {
        self.buf[16] != 0
    }

    pub fn set_is_leaf(&mut self, is_leaf: bool) {
        self.buf[16] = is_leaf as u8;
    }

    pub fn num_slots(&self) -> u32 {
        self.read_u32(17)
    }

    pub fn set_num_slots(&mut self, count: u32) {
        self.write_u32(17, count);
    }

    pub fn free_space_offset(&self) -> u32 {
        self.read_u32(21)
    }

    pub fn set_free_space_offset(&mut self, offset: u32) {
        self.write_u32(21, offset);
    }

    /// Raw buffer access (read-only).
    pub fn data(&self) -> &[u8; PAGE_SIZE] {
        &self.buf
    }

    /// Raw buffer access (mutable).
    pub fn data_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.buf
    }
}
