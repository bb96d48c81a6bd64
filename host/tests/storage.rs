//! Integration tests for the `ext_storage_*` and
//! `ext_default_child_storage_*` imports.

mod common;

use codec::{Compact, Decode, Encode};
use common::{none_option, TestInstance};
use filament_hostapi::{Storage, TrieState};
use filament_host::HostContext;

fn instance_with_entries<K: AsRef<[u8]>, V: AsRef<[u8]>>(entries: &[(K, V)]) -> TestInstance {
    let state = TrieState::with_entries(entries);
    TestInstance::with_context(HostContext::new(Box::new(state)))
}

#[test]
fn test_set_get_roundtrip() {
    let mut instance = TestInstance::new();
    let key = instance.write_span(b"key");
    let value = instance.write_span(b"value");
    instance.call::<(i64, i64), ()>("storage_set", (key, value));

    let key = instance.write_span(b"key");
    let got: i64 = instance.call("storage_get", key);
    assert_eq!(instance.read_span(got), Some(b"value".to_vec()).encode());

    let exists: i32 = instance.call("storage_exists", key);
    assert_eq!(exists, 1);
}

#[test]
fn test_get_missing_key_returns_none() {
    let mut instance = TestInstance::new();
    let key = instance.write_span(b"missing");
    let got: i64 = instance.call("storage_get", key);
    assert_eq!(instance.read_span(got), vec![0x00]);
}

#[test]
fn test_clear_removes_key() {
    let mut instance = instance_with_entries(&[(b"key", b"value")]);
    let key = instance.write_span(b"key");
    instance.call::<i64, ()>("storage_clear", key);
    let got: i64 = instance.call("storage_get", key);
    assert_eq!(instance.read_span(got), vec![0x00]);
}

#[test]
fn test_read_with_offset_and_short_buffer() {
    let mut instance = instance_with_entries(&[(b"key", b"0123456789")]);
    let key = instance.write_span(b"key");

    // A 4-byte buffer at offset 2: the buffer receives "2345", the
    // reported size is the full remaining length 8.
    let buffer = instance.write(&[0u8; 4]);
    let got: i64 = instance.call("storage_read", (key, buffer.as_i64(), 2i32));
    assert_eq!(instance.read_span(got), vec![0x01, 8, 0, 0, 0]);
    assert_eq!(instance.read(buffer.pointer(), 4), b"2345");

    // An offset past the end writes nothing and reports size 0.
    let buffer = instance.write(&[0xEEu8; 4]);
    let got: i64 = instance.call("storage_read", (key, buffer.as_i64(), 40i32));
    assert_eq!(instance.read_span(got), vec![0x01, 0, 0, 0, 0]);
    assert_eq!(instance.read(buffer.pointer(), 4), [0xEE; 4]);

    // A missing key reports None.
    let missing = instance.write_span(b"missing");
    let got: i64 = instance.call("storage_read", (missing, buffer.as_i64(), 0i32));
    assert_eq!(instance.read_span(got), vec![0x00]);
}

#[test]
fn test_next_key_ordering() {
    let mut instance = instance_with_entries(&[(b"aa", b"1"), (b"ab", b"2")]);
    let key = instance.write_span(b"aa");
    let next: i64 = instance.call("storage_next_key", key);
    assert_eq!(instance.read_span(next), Some(b"ab".to_vec()).encode());

    let key = instance.write_span(b"ab");
    let next: i64 = instance.call("storage_next_key", key);
    assert_eq!(instance.read_span(next), vec![0x00]);
}

#[test]
fn test_append_builds_compact_sequence() {
    let mut instance = TestInstance::new();
    let key = instance.write_span(b"seq");
    let item = instance.write_span(&b"ab".to_vec().encode());
    instance.call::<(i64, i64), ()>("storage_append", (key, item));
    let item = instance.write_span(&b"cd".to_vec().encode());
    instance.call::<(i64, i64), ()>("storage_append", (key, item));

    let stored = instance.store.data().storage.get(b"seq").unwrap();
    let decoded = Vec::<Vec<u8>>::decode(&mut &stored[..]).unwrap();
    assert_eq!(decoded, vec![b"ab".to_vec(), b"cd".to_vec()]);
}

#[test]
fn test_transaction_rollback_restores_initial_root() {
    let mut instance = instance_with_entries(&[(b"k1", b"v1")]);

    let initial_root: i64 = instance.call("storage_root", ());
    let initial_root = instance.read_span(initial_root);

    instance.call::<(), ()>("storage_start_transaction", ());
    let k1 = instance.write_span(b"k1");
    let v2 = instance.write_span(b"v2");
    instance.call::<(i64, i64), ()>("storage_set", (k1, v2));
    let k2 = instance.write_span(b"k2");
    let v3 = instance.write_span(b"v3");
    instance.call::<(i64, i64), ()>("storage_set", (k2, v3));
    instance.call::<(), ()>("storage_rollback_transaction", ());

    let got: i64 = instance.call("storage_get", k1);
    assert_eq!(instance.read_span(got), Some(b"v1".to_vec()).encode());
    let got: i64 = instance.call("storage_get", k2);
    assert_eq!(instance.read_span(got), vec![0x00]);

    let root_after: i64 = instance.call("storage_root", ());
    assert_eq!(instance.read_span(root_after), initial_root);
}

#[test]
fn test_transaction_commit_keeps_writes() {
    let mut instance = TestInstance::new();
    instance.call::<(), ()>("storage_start_transaction", ());
    let key = instance.write_span(b"key");
    let value = instance.write_span(b"value");
    instance.call::<(i64, i64), ()>("storage_set", (key, value));
    instance.call::<(), ()>("storage_commit_transaction", ());

    let got: i64 = instance.call("storage_get", key);
    assert_eq!(instance.read_span(got), Some(b"value".to_vec()).encode());
}

#[test]
fn test_changes_root_is_always_none() {
    let mut instance = TestInstance::new();
    let parent = instance.write_span(&[0u8; 32]);
    let got: i64 = instance.call("storage_changes_root", parent);
    assert_eq!(instance.read_span(got), vec![0x00]);
}

#[test]
fn test_clear_prefix_v2_limit_semantics() {
    let entries: Vec<(Vec<u8>, Vec<u8>)> = (0u8..10)
        .map(|i| ([b"p/", &[i][..]].concat(), vec![i]))
        .collect();
    let entry_refs: Vec<(&[u8], &[u8])> = entries
        .iter()
        .map(|(k, v)| (k.as_slice(), v.as_slice()))
        .collect();
    let mut instance = instance_with_entries(&entry_refs);

    // Limit 3: three removed, keys remain (tag 1).
    let prefix = instance.write_span(b"p/");
    let limit = instance.write_span(&Some(3u32.to_le_bytes().to_vec()).encode());
    let got: i64 = instance.call("storage_clear_prefix_v2", (prefix, limit));
    assert_eq!(instance.read_span(got), vec![1, 3, 0, 0, 0]);

    // Limit 0: nothing removed, reported as keys-remaining.
    let limit = instance.write_span(&Some(0u32.to_le_bytes().to_vec()).encode());
    let got: i64 = instance.call("storage_clear_prefix_v2", (prefix, limit));
    assert_eq!(instance.read_span(got), vec![1, 0, 0, 0, 0]);

    // Limit None behaves as unlimited: the remaining seven go (tag 0).
    let limit = instance.write_span(&none_option());
    let got: i64 = instance.call("storage_clear_prefix_v2", (prefix, limit));
    assert_eq!(instance.read_span(got), vec![0, 7, 0, 0, 0]);
}

#[test]
fn test_clear_prefix_v1_is_unbounded() {
    let mut instance =
        instance_with_entries(&[(&b"p1"[..], &b"1"[..]), (&b"p2"[..], &b"2"[..]), (&b"q"[..], &b"3"[..])]);
    let prefix = instance.write_span(b"p");
    instance.call::<i64, ()>("storage_clear_prefix", prefix);

    assert!(instance.store.data().storage.get(b"p1").is_none());
    assert!(instance.store.data().storage.get(b"p2").is_none());
    assert!(instance.store.data().storage.get(b"q").is_some());
}

// ── child storage ──

#[test]
fn test_child_storage_isolation_and_root() {
    let mut instance = TestInstance::new();
    let child = instance.write_span(b"child-a");
    let key = instance.write_span(b"key");
    let value = instance.write_span(b"value");
    instance.call::<(i64, i64, i64), ()>("child_set", (child, key, value));

    let got: i64 = instance.call("child_get", (child, key));
    assert_eq!(instance.read_span(got), Some(b"value".to_vec()).encode());

    // The main trie does not see the child's key.
    let got: i64 = instance.call("storage_get", key);
    assert_eq!(instance.read_span(got), vec![0x00]);

    // The child root is an option-wrapped 32-byte hash.
    let root: i64 = instance.call("child_root", child);
    let root = instance.read_span(root);
    assert_eq!(root[0], 0x01);
    assert_eq!(root.len(), 2 + 32); // tag + compact(32) + hash

    let exists: i32 = instance.call("child_exists", (child, key));
    assert_eq!(exists, 1);
    instance.call::<(i64, i64), ()>("child_clear", (child, key));
    let exists: i32 = instance.call("child_exists", (child, key));
    assert_eq!(exists, 0);
}

#[test]
fn test_child_read_and_next_key() {
    let mut instance = TestInstance::new();
    let child = instance.write_span(b"child-a");
    for (k, v) in [(&b"k1"[..], &b"0123"[..]), (&b"k2"[..], &b"9"[..])] {
        let key = instance.write_span(k);
        let value = instance.write_span(v);
        instance.call::<(i64, i64, i64), ()>("child_set", (child, key, value));
    }

    let key = instance.write_span(b"k1");
    let buffer = instance.write(&[0u8; 2]);
    let got: i64 = instance.call("child_read", (child, key, buffer.as_i64(), 1i32));
    assert_eq!(instance.read_span(got), vec![0x01, 3, 0, 0, 0]);
    assert_eq!(instance.read(buffer.pointer(), 2), b"12");

    let next: i64 = instance.call("child_next_key", (child, key));
    assert_eq!(instance.read_span(next), Some(b"k2".to_vec()).encode());
}

#[test]
fn test_storage_kill_v3_limit_encoding() {
    let mut instance = TestInstance::new();
    let child = instance.write_span(b"child-a");
    for i in 0u8..10 {
        let key = instance.write_span(&[i]);
        let value = instance.write_span(&[i]);
        instance.call::<(i64, i64, i64), ()>("child_set", (child, key, value));
    }

    // Limit 3: SomeRemaining(3) — tag 1, little-endian u32 3.
    let limit = instance.write_span(&Some(3u32.to_le_bytes().to_vec()).encode());
    let got: i64 = instance.call("child_kill_v3", (child, limit));
    assert_eq!(instance.read_span(got), vec![1, 3, 0, 0, 0]);

    // Limit None: AllRemoved(7) for the remaining keys.
    let limit = instance.write_span(&none_option());
    let got: i64 = instance.call("child_kill_v3", (child, limit));
    assert_eq!(instance.read_span(got), vec![0, 7, 0, 0, 0]);
}

#[test]
fn test_storage_kill_v1_and_v2() {
    let mut instance = TestInstance::new();
    let child = instance.write_span(b"child-a");
    for i in 0u8..4 {
        let key = instance.write_span(&[i]);
        let value = instance.write_span(&[i]);
        instance.call::<(i64, i64, i64), ()>("child_set", (child, key, value));
    }

    // v2 with a limit below the key count reports incompleteness.
    let limit = instance.write_span(&Some(2u32.to_le_bytes().to_vec()).encode());
    let all_removed: i32 = instance.call("child_kill_v2", (child, limit));
    assert_eq!(all_removed, 0);

    // v1 deletes whatever is left.
    instance.call::<i64, ()>("child_kill", child);
    let key = instance.write_span(&[3u8]);
    let got: i64 = instance.call("child_get", (child, key));
    assert_eq!(instance.read_span(got), vec![0x00]);
}

#[test]
fn test_storage_root_matches_state_root() {
    let mut instance = instance_with_entries(&[(b"k", b"v")]);
    let from_import: i64 = instance.call("storage_root", ());
    let expected = instance.store.data().storage.root();
    assert_eq!(instance.read_span(from_import), expected.to_vec());
}

#[test]
fn test_compact_prefix_of_append_grows() {
    // Cross the single-byte compact boundary through the import.
    let mut instance = TestInstance::new();
    let key = instance.write_span(b"seq");
    for _ in 0..70 {
        let item = instance.write_span(&Compact(1u8 as u32).encode());
        instance.call::<(i64, i64), ()>("storage_append", (key, item));
    }
    let stored = instance.store.data().storage.get(b"seq").unwrap();
    let mut input = &stored[..];
    let Compact(count) = Compact::<u32>::decode(&mut input).unwrap();
    assert_eq!(count, 70);
}
