//! End-to-end tests for the digit trie and its key encoders.

use capkit::syskit::trie_keys::{StrKey, StrKeyForm, UxxKey, UxxKeyWidth};
use capkit::Trie;

#[test]
fn add_then_find_round_trips_and_bumps_count() {
    let mut t: Trie<i32> = Trie::new(StrKey::max_digit(StrKeyForm::Ascii));
    let key = StrKey::encode(StrKeyForm::Ascii, b"hello");
    assert!(t.add(&key, 1));
    assert_eq!(t.find(&key), Some(&1));
    assert_eq!(t.num_kv_pairs(), 1);
}

#[test]
fn add_rejects_duplicate_key() {
    let mut t: Trie<i32> = Trie::new(StrKey::max_digit(StrKeyForm::Ascii));
    let key = StrKey::encode(StrKeyForm::Ascii, b"dup");
    assert!(t.add(&key, 1));
    assert!(!t.add(&key, 2));
    assert_eq!(t.find(&key), Some(&1));
}

#[test]
fn associate_is_idempotent_after_first_call() {
    let mut t: Trie<i32> = Trie::new(StrKey::max_digit(StrKeyForm::Ascii));
    let key = StrKey::encode(StrKeyForm::Ascii, b"k");
    assert_eq!(t.associate(&key, 10), None);
    assert_eq!(t.associate(&key, 10), Some(10));
    assert_eq!(t.associate(&key, 10), Some(10));
}

#[test]
fn count_kv_pairs_matches_keys_sharing_a_prefix() {
    let mut t: Trie<i32> = Trie::new(StrKey::max_digit(StrKeyForm::Ascii));
    for word in ["car", "cart", "cartoon", "dog"] {
        let key = StrKey::encode(StrKeyForm::Ascii, word.as_bytes());
        t.add(&key, word.len() as i32);
    }
    let prefix = StrKey::encode(StrKeyForm::Ascii, b"car");
    assert_eq!(t.count_kv_pairs(&prefix), 3);
}

#[test]
fn rm_all_removes_every_key_under_a_prefix() {
    let mut t: Trie<i32> = Trie::new(StrKey::max_digit(StrKeyForm::Ascii));
    for word in ["car", "cart", "cartoon", "dog"] {
        let key = StrKey::encode(StrKeyForm::Ascii, word.as_bytes());
        t.add(&key, 0);
    }
    let prefix = StrKey::encode(StrKeyForm::Ascii, b"car");
    assert_eq!(t.rm_all(&prefix), 3);
    assert_eq!(t.count_kv_pairs(&prefix), 0);
    assert_eq!(t.num_kv_pairs(), 1);
}

#[test]
fn traversal_visits_every_pair_exactly_once() {
    let mut t: Trie<i32> = Trie::new(StrKey::max_digit(StrKeyForm::Ascii));
    let words = ["a", "ab", "abc", "b", "ba"];
    for w in words {
        t.add(&StrKey::encode(StrKeyForm::Ascii, w.as_bytes()), 0);
    }
    let mut seen = 0;
    t.apply_child_first(&mut |_k, _v| {
        seen += 1;
        true
    });
    assert_eq!(seen, words.len());

    let mut seen_parent = 0;
    t.apply_parent_first(&mut |_k, _v| {
        seen_parent += 1;
        true
    });
    assert_eq!(seen_parent, words.len());
}

#[test]
fn uxx_key_round_trips_for_sample_values() {
    for value in [0u64, 0x12345678] {
        let digits = UxxKey::encode(UxxKeyWidth::U32, value);
        assert_eq!(UxxKey::decode(UxxKeyWidth::U32, &digits), value);
    }
}

#[test]
fn hex_and_upper_hex_encode_the_same_digits() {
    let lower = StrKey::encode(StrKeyForm::Hex, b"abc");
    let upper = StrKey::encode(StrKeyForm::HEX, b"ABC");
    assert_eq!(lower, upper);
}
