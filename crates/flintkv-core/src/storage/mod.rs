//! Storage engine: page buffers, the slotted-leaf layout, the meta page, and
//! the file-backed pager.

pub mod meta;
pub mod page;
pub mod pager;
pub mod slotted;
