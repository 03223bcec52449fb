//! Slotted-leaf layout.
//!
//! A leaf page keeps a slot directory immediately after the header, growing
//! upward, and a record heap anchored to the end of the page, growing
//! downward; `free_space_offset` is the boundary between them. Each slot is
//! 4 bytes, `(record_offset: u16, record_length: u16)` little-endian, and the
//! directory is kept sorted by the keys the slots reference, so binary search
//! over slots yields sorted order without touching the heap.
//!
//! Heap records are encoded `[kLen:1][key][vLen:1][value]`; key and value
//! lengths are each at most 255.

use std::cmp::Ordering;

use crate::error::StorageError;
use crate::storage::page::Page;
use crate::types::{PAGE_HEADER_SIZE, PAGE_SIZE, SLOT_SIZE};

fn slot_base(slot_idx: usize) -> usize {
    PAGE_HEADER_SIZE + slot_idx * SLOT_SIZE
}

/// Read the slot entry at `slot_idx`. Returns `(offset, length)`.
pub fn read_slot(page: &Page, slot_idx: usize) -> (u16, u16) {
    let base = slot_base(slot_idx);
    let buf = page.data();
    let offset = u16::from_le_bytes([buf[base], buf[base + 1]]);
    let length = u16::from_le_bytes([buf[base + 2], buf[base + 3]]);
    (offset, length)
}

fn write_slot(page: &mut Page, slot_idx: usize, offset: u16, length: u16) {
    let base = slot_base(slot_idx);
    let buf = page.data_mut();
    buf[base..base + 2].copy_from_slice(&offset.to_le_bytes());
    buf[base + 2..base + 4].copy_from_slice(&length.to_le_bytes());
}

/// Encoded size of a record: two length bytes plus key and value.
pub fn record_size(key: &[u8], value: &[u8]) -> usize {
    key.len() + value.len() + 2
}

/// Decode the record at `slot_idx` into `(key, value)` slices.
pub fn record_at(page: &Page, slot_idx: usize) -> (&[u8], &[u8]) {
    let (offset, _) = read_slot(page, slot_idx);
    let buf = page.data();
    let mut pos = offset as usize;
    let klen = buf[pos] as usize;
    pos += 1;
    let key = &buf[pos..pos + klen];
    pos += klen;
    let vlen = buf[pos] as usize;
    pos += 1;
    let value = &buf[pos..pos + vlen];
    (key, value)
}

/// The key referenced by the slot at `slot_idx`.
pub fn key_at(page: &Page, slot_idx: usize) -> &[u8] {
    let (offset, _) = read_slot(page, slot_idx);
    let buf = page.data();
    let klen = buf[offset as usize] as usize;
    &buf[offset as usize + 1..offset as usize + 1 + klen]
}

/// Binary search the sorted slot directory for `key`.
///
/// Returns `Ok(i)` for an exact match at slot `i`, or `Err(i)` with the
/// index at which the key would be inserted (the first slot whose key is
/// greater, or `num_slots` if none).
pub fn binary_search(page: &Page, key: &[u8]) -> Result<usize, usize> {
    let mut low = 0usize;
    let mut high = page.num_slots() as usize;
    while low < high {
        let mid = low + (high - low) / 2;
        match key_at(page, mid).cmp(key) {
            Ordering::Less => low = mid + 1,
            Ordering::Equal => return Ok(mid),
            Ordering::Greater => high = mid,
        }
    }
    Err(low)
}

/// Insert a record at `slot_idx`, shifting subsequent slots one place right.
///
/// The caller is responsible for picking the order-preserving index (see
/// [`binary_search`]). Fails when the heap and the grown slot directory
/// would overlap.
pub fn insert_at(
    page: &mut Page,
    slot_idx: usize,
    key: &[u8],
    value: &[u8],
) -> Result<(), StorageError> {
    let count = page.num_slots() as usize;
    let size = record_size(key, value);
    let fso = page.free_space_offset() as usize;
    let directory_end = PAGE_HEADER_SIZE + (count + 1) * SLOT_SIZE;
    if fso < size || fso - size < directory_end {
        return Err(StorageError::CorruptedPage(
            "not enough free space in leaf page".to_string(),
        ));
    }

    // Write the record into the heap.
    let record_offset = fso - size;
    let buf = page.data_mut();
    let mut pos = record_offset;
    buf[pos] = key.len() as u8;
    pos += 1;
    buf[pos..pos + key.len()].copy_from_slice(key);
    pos += key.len();
    buf[pos] = value.len() as u8;
    pos += 1;
    buf[pos..pos + value.len()].copy_from_slice(value);

    // Shift the slot suffix right and install the new slot.
    for i in (slot_idx..count).rev() {
        let (offset, length) = read_slot(page, i);
        write_slot(page, i + 1, offset, length);
    }
    write_slot(page, slot_idx, record_offset as u16, size as u16);

    page.set_num_slots(count as u32 + 1);
    page.set_free_space_offset(record_offset as u32);
    Ok(())
}

/// Remove the slot at `slot_idx`, shifting subsequent slots one place left.
///
/// The heap space of the removed record is reclaimed by [`defragment`].
pub fn remove_at(page: &mut Page, slot_idx: usize) {
    let count = page.num_slots() as usize;
    for i in slot_idx..count - 1 {
        let (offset, length) = read_slot(page, i + 1);
        write_slot(page, i, offset, length);
    }
    page.set_num_slots(count as u32 - 1);
}

/// Rebuild the heap so live records pack tightly against the end of the
/// page: records are re-emitted in slot order from `PAGE_SIZE` downward,
/// slot offsets are updated, `free_space_offset` drops to the new low-water
/// mark, and the space between the slot directory and the heap is zeroed.
pub fn defragment(page: &mut Page) {
    let count = page.num_slots() as usize;

    let mut records: Vec<Vec<u8>> = Vec::with_capacity(count);
    for i in 0..count {
        let (offset, length) = read_slot(page, i);
        let start = offset as usize;
        records.push(page.data()[start..start + length as usize].to_vec());
    }

    let directory_end = PAGE_HEADER_SIZE + count * SLOT_SIZE;
    page.data_mut()[directory_end..PAGE_SIZE].fill(0);

    let mut write_offset = PAGE_SIZE;
    for (i, record) in records.iter().enumerate() {
        write_offset -= record.len();
        page.data_mut()[write_offset..write_offset + record.len()].copy_from_slice(record);
        write_slot(page, i, write_offset as u16, record.len() as u16);
    }

    page.set_free_space_offset(write_offset as u32);
}
