use crate::{Handle, HandleError, StringTable};

#[test]
fn insert_then_lookup_round_trips() {
    let mut table: StringTable = StringTable::new();

    let inserted = table.insert(b"identifier").unwrap().handle();
    let found = table.lookup(b"identifier").unwrap();
    assert_eq!(found.handle(), inserted);
    assert_eq!(found.len(), 10);
    assert_eq!(found.as_bytes(), b"identifier");
    assert_eq!(found.as_bytes_with_nul(), b"identifier\0");
}

#[test]
fn duplicate_insert_reports_already_present() {
    let mut table: StringTable = StringTable::new();

    assert!(table.insert(b"dup").is_some());
    assert!(table.insert(b"dup").is_none());
    assert_eq!(table.len(), 1);
}

#[test]
fn update_is_idempotent_get_or_create() {
    let mut table: StringTable = StringTable::new();

    let first = table.update(b"sym").handle();
    let second = table.update(b"sym").handle();
    assert_eq!(first, second);
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(first).as_bytes(), b"sym");
}

#[test]
fn lookup_on_absent_key_is_none() {
    let mut table: StringTable = StringTable::new();
    table.insert(b"present").unwrap();

    assert!(table.lookup(b"absent").is_none());
}

#[test]
fn empty_string_is_a_real_key() {
    let mut table: StringTable = StringTable::new();

    assert!(table.lookup(b"").is_none());
    let value = table.insert(b"").unwrap();
    assert_eq!(value.len(), 0);
    assert!(value.is_empty());
    assert_eq!(value.as_bytes_with_nul(), b"\0");

    assert!(table.insert(b"").is_none());
    assert!(table.lookup(b"").is_some());
}

#[test]
fn growth_preserves_content_and_handles() {
    let mut table: StringTable = StringTable::new();
    assert_eq!(table.capacity(), 32);

    let keys: Vec<Vec<u8>> = (0..100).map(|i| format!("name_{i}").into_bytes()).collect();
    let mut handles: Vec<Handle> = Vec::new();
    for key in &keys {
        handles.push(table.insert(key).unwrap().handle());
    }

    // 100 entries at load factor 0.8 need at least 128 slots.
    assert!(table.capacity() >= 128);
    for (key, handle) in keys.iter().zip(&handles) {
        let found = table.lookup(key).unwrap();
        assert_eq!(found.handle(), *handle, "handle changed across growth");
        assert_eq!(found.as_bytes(), key.as_slice());
        assert_eq!(table.get(*handle).as_bytes(), key.as_slice());
    }
    assert_eq!(table.len(), 100);
}

#[test]
fn mixed_insert_update_growth_sequence() {
    let mut table: StringTable = StringTable::with_capacity(4);

    let foo = table.insert(b"foo").unwrap().handle();
    assert!(table.insert(b"bar").is_some());
    assert!(table.insert(b"foo").is_none());

    let updated = table.update(b"foo");
    assert_eq!(updated.len(), 3);
    assert_eq!(updated.as_bytes(), b"foo");
    assert_eq!(updated.handle(), foo);

    // Force at least one growth.
    let before = table.capacity();
    for i in 0..64 {
        table.update(format!("extra-{i}").as_bytes());
    }
    assert!(table.capacity() > before);

    assert_eq!(table.lookup(b"foo").unwrap().as_bytes(), b"foo");
    assert_eq!(table.lookup(b"bar").unwrap().as_bytes(), b"bar");
    assert_eq!(table.lookup(b"foo").unwrap().handle(), foo);
}

#[test]
fn records_survive_pool_rollover() {
    let mut table: StringTable = StringTable::new();
    let keys: Vec<Vec<u8>> = (0..60)
        .map(|i| format!("{i:03}-{}", "p".repeat(90)).into_bytes())
        .collect();

    for key in &keys {
        table.insert(key).unwrap();
    }
    assert!(table.pool_count() > 1, "test should span multiple pools");

    for key in &keys {
        assert_eq!(table.lookup(key).unwrap().as_bytes(), key.as_slice());
    }
}

#[test]
fn oversized_key_does_not_disturb_neighbors() {
    let mut table: StringTable = StringTable::new();
    table.insert(b"small").unwrap();

    let huge = vec![b'h'; 10_000];
    let handle = table.insert(&huge).unwrap().handle();

    assert_eq!(table.get(handle).as_bytes(), huge.as_slice());
    assert_eq!(table.lookup(b"small").unwrap().as_bytes(), b"small");
}

#[test]
fn payload_defaults_to_zero_and_round_trips() {
    let mut table: StringTable<u64> = StringTable::new();

    let handle = table.insert(b"fn_main").unwrap().handle();
    assert_eq!(*table.get(handle).payload(), 0);

    *table.payload_mut(handle) = 0xdead_beef;
    assert_eq!(*table.lookup(b"fn_main").unwrap().payload(), 0xdead_beef);

    // Growth must not detach payloads from their records.
    for i in 0..50 {
        table.update(format!("filler-{i}").as_bytes());
    }
    assert_eq!(*table.get(handle).payload(), 0xdead_beef);
}

#[test]
fn try_get_rejects_foreign_handles() {
    let mut owner: StringTable = StringTable::new();
    let handle = owner.insert(b"owned").unwrap().handle();

    let stranger: StringTable = StringTable::new();
    assert_eq!(
        stranger.try_get(handle).unwrap_err(),
        HandleError::PoolOutOfRange { pool: 1, pools: 0 }
    );

    // In-bounds but not the start of any record.
    let forged = Handle::from_raw(handle.as_u32() + 8).unwrap();
    assert!(owner.try_get(forged).is_err());

    assert_eq!(owner.get(handle).as_bytes(), b"owned");
}

#[test]
#[should_panic(expected = "StringTable::get")]
fn get_panics_on_foreign_handle() {
    let table: StringTable = StringTable::new();
    let foreign = Handle::from_raw(1 << 12).unwrap();
    table.get(foreign);
}

#[test]
fn capacity_hint_rounds_up() {
    assert_eq!(StringTable::<()>::with_capacity(0).capacity(), 32);
    assert_eq!(StringTable::<()>::with_capacity(4).capacity(), 32);
    assert_eq!(StringTable::<()>::with_capacity(100).capacity(), 128);
    // 200 + 50 = 250 rounds to 256.
    assert_eq!(StringTable::<()>::with_capacity(200).capacity(), 256);
}

#[test]
fn hint_sized_table_takes_hint_inserts_without_growing() {
    let mut table: StringTable = StringTable::with_capacity(25);
    let capacity = table.capacity();

    for i in 0..25 {
        table.insert(format!("k{i}").as_bytes()).unwrap();
    }
    assert_eq!(table.capacity(), capacity);
}

#[test]
fn iter_walks_creation_order() {
    let mut table: StringTable = StringTable::new();
    table.insert(b"first").unwrap();
    table.insert(b"second").unwrap();
    table.update(b"first"); // no new record
    table.insert(b"third").unwrap();

    let keys: Vec<&[u8]> = table.iter().map(|v| v.as_bytes()).collect();
    assert_eq!(keys, vec![&b"first"[..], b"second", b"third"]);
}

#[test]
fn as_str_is_utf8_gated() {
    let mut table: StringTable = StringTable::new();

    let text = table.insert(b"caf\xc3\xa9").unwrap();
    assert_eq!(text.as_str(), Some("café"));

    let raw = table.insert(&[0xff, 0xfe]).unwrap();
    assert_eq!(raw.as_str(), None);
}

#[test]
fn binary_keys_with_interior_nul_are_distinct() {
    let mut table: StringTable = StringTable::new();

    let a = table.insert(b"a\0b").unwrap().handle();
    let b = table.insert(b"a").unwrap().handle();
    assert_ne!(a, b);
    assert_eq!(table.lookup(b"a\0b").unwrap().handle(), a);
    assert_eq!(table.lookup(b"a").unwrap().handle(), b);
}

#[test]
fn debug_summarizes_shape() {
    let mut table: StringTable = StringTable::new();
    table.insert(b"x").unwrap();

    let dump = format!("{table:?}");
    assert!(dump.contains("StringTable"));
    assert!(dump.contains("len: 1"));
}
