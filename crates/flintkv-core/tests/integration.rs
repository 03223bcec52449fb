//! End-to-end tests exercising the public API against real files.

use flintkv_core::api::FlintKV;
use flintkv_core::memtable::{JoinedPair, Memtable, compact::compact};
use flintkv_core::types::PAGE_SIZE;
use tempfile::tempdir;

fn padded_key(i: usize) -> Vec<u8> {
    format!("key{i:04}").into_bytes()
}

#[test]
fn basic_puts_and_replace() {
    let dir = tempdir().unwrap();
    let mut db = FlintKV::open(dir.path().join("s1.db")).unwrap();

    db.put(b"apple", b"red").unwrap();
    db.put(b"banana", b"yellow").unwrap();
    db.put(b"grape", b"purple").unwrap();
    db.put(b"apple", b"green").unwrap();

    assert_eq!(db.get(b"apple").unwrap().as_deref(), Some(&b"green"[..]));
    assert_eq!(db.get(b"banana").unwrap().as_deref(), Some(&b"yellow"[..]));
    assert_eq!(db.get(b"grape").unwrap().as_deref(), Some(&b"purple"[..]));
    assert_eq!(db.get(b"cherry").unwrap(), None);
}

#[test]
fn thousand_keys_lookup_and_bounded_scan() {
    let dir = tempdir().unwrap();
    let mut db = FlintKV::open(dir.path().join("s2.db")).unwrap();

    for i in 1..=1000usize {
        let value = format!("val{i}");
        db.put(&padded_key(i), value.as_bytes()).unwrap();
    }

    assert_eq!(db.get(b"key0500").unwrap().as_deref(), Some(&b"val500"[..]));

    let pairs = db.scan(b"key0490", b"key0510").unwrap();
    assert_eq!(pairs.len(), 21);
    assert_eq!(pairs[0].0, b"key0490");
    assert_eq!(pairs[20].0, b"key0510");
    assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
}

#[test]
fn remove_even_keys_leaves_odd_keys() {
    let dir = tempdir().unwrap();
    let mut db = FlintKV::open(dir.path().join("s3.db")).unwrap();

    for i in 1..=1000usize {
        let value = format!("val{i}");
        db.put(&padded_key(i), value.as_bytes()).unwrap();
    }
    for i in (2..=1000usize).step_by(2) {
        assert!(db.remove(&padded_key(i)).unwrap());
    }

    for i in 1..=1000usize {
        let got = db.get(&padded_key(i)).unwrap();
        if i % 2 == 0 {
            assert_eq!(got, None, "key {i} should be gone");
        } else {
            assert_eq!(got.as_deref(), Some(format!("val{i}").as_bytes()));
        }
    }
}

#[test]
fn first_put_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s4.db");

    {
        let mut db = FlintKV::open(&path).unwrap();
        db.put(b"k", b"v").unwrap();
    }

    let mut db = FlintKV::open(&path).unwrap();
    assert_eq!(db.get(b"k").unwrap().as_deref(), Some(&b"v"[..]));

    let len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(len % PAGE_SIZE as u64, 0);
    assert!(
        (2..=3).contains(&(len / PAGE_SIZE as u64)),
        "expected meta + root leaf (+ at most one more), got {} pages",
        len / PAGE_SIZE as u64
    );
}

#[test]
fn full_scan_after_splits_is_sorted_and_complete() {
    let dir = tempdir().unwrap();
    let mut db = FlintKV::open(dir.path().join("s5.db")).unwrap();

    // Wide values force several leaf splits.
    let value = vec![b'x'; 200];
    for i in (0..120usize).rev() {
        db.put(&padded_key(i), &value).unwrap();
    }

    let pairs = db.scan(b"", &[0xff; 15]).unwrap();
    assert_eq!(pairs.len(), 120);
    assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
    for (i, (key, _)) in pairs.iter().enumerate() {
        assert_eq!(key, &padded_key(i));
    }
}

#[test]
fn state_survives_reopen_after_splits() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reopen.db");

    {
        let mut db = FlintKV::open(&path).unwrap();
        for i in 0..1000usize {
            let value = format!("val{i}");
            db.put(&padded_key(i), value.as_bytes()).unwrap();
        }
        for i in (0..1000usize).step_by(7) {
            db.remove(&padded_key(i)).unwrap();
        }
        db.sync().unwrap();
    }

    let mut db = FlintKV::open(&path).unwrap();
    for i in 0..1000usize {
        let got = db.get(&padded_key(i)).unwrap();
        if i % 7 == 0 {
            assert_eq!(got, None);
        } else {
            assert_eq!(got.as_deref(), Some(format!("val{i}").as_bytes()));
        }
    }

    let pairs = db.scan(&padded_key(100), &padded_key(120)).unwrap();
    assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
    assert_eq!(pairs.len(), 21 - 3); // 105, 112, 119 were removed
}

#[test]
fn query_builder_filters_orders_and_limits() {
    let dir = tempdir().unwrap();
    let mut db = FlintKV::open(dir.path().join("query.db")).unwrap();

    for i in 0..30usize {
        let key = format!("user_{i:02}");
        let value = if i % 3 == 0 { b"admin".to_vec() } else { b"member".to_vec() };
        db.put(key.as_bytes(), &value).unwrap();
    }
    db.put(b"zz_trailer", b"x").unwrap();

    let admins = db
        .query()
        .range(b"user_".to_vec(), b"user_~".to_vec())
        .filter(|_, value| value == b"admin")
        .descending()
        .limit(3)
        .execute()
        .unwrap();

    assert_eq!(admins.len(), 3);
    assert_eq!(admins[0].0, b"user_27");
    assert_eq!(admins[1].0, b"user_24");
    assert_eq!(admins[2].0, b"user_21");
}

#[test]
fn memtable_flush_and_compact_files() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("data_v1.bin");
    let b = dir.path().join("data_v2.bin");
    let c = dir.path().join("data_merged.bin");

    let mut v1 = Memtable::new();
    v1.put(b"user_1".to_vec(), b"Alice".to_vec());
    v1.put(b"user_2".to_vec(), b"Bob".to_vec());
    v1.flush(&a).unwrap();

    let mut v2 = Memtable::new();
    v2.remove(b"user_1".to_vec());
    v2.put(b"user_2".to_vec(), b"Bobby".to_vec());
    v2.put(b"user_3".to_vec(), b"Charlie".to_vec());
    v2.flush(&b).unwrap();

    compact(&a, &b, &c).unwrap();

    // Re-read the merged file through a fresh memtable-style decode: the
    // records must be exactly user_2 -> Bobby, user_3 -> Charlie, in order.
    let raw = std::fs::read(&c).unwrap();
    let mut records = Vec::new();
    let mut pos = 0usize;
    while pos < raw.len() {
        let klen = u16::from_le_bytes([raw[pos], raw[pos + 1]]) as usize;
        pos += 2;
        let key = raw[pos..pos + klen].to_vec();
        pos += klen;
        let vlen = u16::from_le_bytes([raw[pos], raw[pos + 1]]) as usize;
        pos += 2;
        let value = raw[pos..pos + vlen].to_vec();
        pos += vlen;
        records.push((key, value));
    }
    assert_eq!(
        records,
        vec![
            (b"user_2".to_vec(), b"Bobby".to_vec()),
            (b"user_3".to_vec(), b"Charlie".to_vec()),
        ]
    );
}

#[test]
fn join_two_maps_over_a_key_range() {
    let mut users = Memtable::new();
    users.put(b"101".to_vec(), b"Alice".to_vec());
    users.put(b"102".to_vec(), b"Bob".to_vec());
    users.put(b"103".to_vec(), b"Charlie".to_vec());

    let mut orders = Memtable::new();
    orders.put(b"101".to_vec(), b"Laptop".to_vec());
    orders.put(b"103".to_vec(), b"Smartphone".to_vec());
    orders.put(b"104".to_vec(), b"Tablet".to_vec());

    // Bob has no order, and the Tablet order has no user in range.
    let rows = users.join(&orders, b"101", b"103");
    assert_eq!(
        rows,
        vec![
            JoinedPair {
                key: b"101".to_vec(),
                left: b"Alice".to_vec(),
                right: b"Laptop".to_vec(),
            },
            JoinedPair {
                key: b"103".to_vec(),
                left: b"Charlie".to_vec(),
                right: b"Smartphone".to_vec(),
            },
        ]
    );
}

#[test]
fn oversized_key_errors_and_oversized_record_drops() {
    let dir = tempdir().unwrap();
    let mut db = FlintKV::open(dir.path().join("limits.db")).unwrap();

    assert!(db.put(&[b'k'; 16], b"v").is_err());

    // Oversized records are reported and dropped, not raised.
    db.put(b"big", &vec![b'v'; PAGE_SIZE]).unwrap();
    assert_eq!(db.get(b"big").unwrap(), None);
}
