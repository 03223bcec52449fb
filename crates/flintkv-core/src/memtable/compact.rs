//! Disk-to-disk streaming compaction of flushed memtable files.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use super::TOMBSTONE;
use crate::error::Result;

/// Read one `[kLen:u16][key][vLen:u16][value]` record, or `None` at end of
/// input. End-of-file inside a record is surfaced as an error.
fn read_record(input: &mut impl Read) -> io::Result<Option<(Vec<u8>, Vec<u8>)>> {
    let klen = match input.read_u16::<LittleEndian>() {
        Ok(n) => n as usize,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut key = vec![0u8; klen];
    input.read_exact(&mut key)?;
    let vlen = input.read_u16::<LittleEndian>()? as usize;
    let mut value = vec![0u8; vlen];
    input.read_exact(&mut value)?;
    Ok(Some((key, value)))
}

fn write_record(out: &mut impl Write, key: &[u8], value: &[u8]) -> io::Result<()> {
    out.write_u16::<LittleEndian>(key.len() as u16)?;
    out.write_all(key)?;
    out.write_u16::<LittleEndian>(value.len() as u16)?;
    out.write_all(value)?;
    Ok(())
}

/// Merge two flushed files into `out_path`, one record of lookahead per
/// input.
///
/// Both inputs must be ascending by key (the order [`Memtable::flush`]
/// produces). At each step the smaller key is emitted; on a tie the record
/// from `newer_path` wins and the shadowed record from `old_path` is
/// consumed and discarded. Records whose value is the [`TOMBSTONE`] marker
/// are dropped. The output is ascending with no duplicate keys and no
/// tombstones.
///
/// [`Memtable::flush`]: super::Memtable::flush
pub fn compact(old_path: &Path, newer_path: &Path, out_path: &Path) -> Result<()> {
    let mut old_in = BufReader::new(File::open(old_path)?);
    let mut newer_in = BufReader::new(File::open(newer_path)?);
    let mut out = BufWriter::new(File::create(out_path)?);

    let mut old_rec = read_record(&mut old_in)?;
    let mut newer_rec = read_record(&mut newer_in)?;
    let mut emitted = 0usize;
    let mut dropped = 0usize;

    loop {
        match (old_rec.take(), newer_rec.take()) {
            (None, None) => break,
            (Some((key, value)), None) => {
                if value != TOMBSTONE {
                    write_record(&mut out, &key, &value)?;
                    emitted += 1;
                } else {
                    dropped += 1;
                }
                old_rec = read_record(&mut old_in)?;
            }
            (None, Some((key, value))) => {
                if value != TOMBSTONE {
                    write_record(&mut out, &key, &value)?;
                    emitted += 1;
                } else {
                    dropped += 1;
                }
                newer_rec = read_record(&mut newer_in)?;
            }
            (Some((old_key, old_value)), Some((new_key, new_value))) => {
                if new_key <= old_key {
                    if new_value != TOMBSTONE {
                        write_record(&mut out, &new_key, &new_value)?;
                        emitted += 1;
                    } else {
                        dropped += 1;
                    }
                    if old_key == new_key {
                        // The newer record shadows the older one.
                        old_rec = read_record(&mut old_in)?;
                        dropped += 1;
                    } else {
                        old_rec = Some((old_key, old_value));
                    }
                    newer_rec = read_record(&mut newer_in)?;
                } else {
                    if old_value != TOMBSTONE {
                        write_record(&mut out, &old_key, &old_value)?;
                        emitted += 1;
                    } else {
                        dropped += 1;
                    }
                    old_rec = read_record(&mut old_in)?;
                    newer_rec = Some((new_key, new_value));
                }
            }
        }
    }

    out.flush()?;
    debug!(emitted, dropped, "compaction finished");
    Ok(())
}
