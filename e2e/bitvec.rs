//! End-to-end tests for the packed bit vector.

use capkit::BitVec;

#[test]
fn count_set_and_clear_bits_partition_the_vector() {
    let v = BitVec::new(1024, true);
    assert_eq!(v.count_set_bits() + v.count_clear_bits(), v.max_bits());
}

#[test]
fn set_all_then_clear_all_is_fully_clear() {
    let mut v = BitVec::new(200, false);
    v.set_all();
    v.clear_all();
    assert!(v.is_clear());
    assert_eq!(v.count_set_bits(), 0);
}

#[test]
fn invert_is_its_own_inverse() {
    let mut v = BitVec::new(37, false);
    v.set(0);
    v.set(36);
    v.set(18);
    let v2 = v.invert().invert();
    assert_eq!(v, v2);
}

#[test]
fn clear_then_set_restores_bit() {
    let mut v = BitVec::new(64, true);
    for i in 0..64 {
        v.clear(i);
        v.set(i);
        assert!(v.is_set(i));
    }
}

#[test]
fn raw_round_trip_preserves_bits() {
    let mut v = BitVec::new(130, false);
    v.set(0);
    v.set(129);
    v.set(64);
    let raw = v.raw();
    let v2 = BitVec::from_raw(130, &raw);
    assert_eq!(v, v2);
}

#[test]
fn resize_below_current_size_fails_and_leaves_vector_unchanged() {
    let mut v = BitVec::new(100, true);
    let before = v.clone();
    assert!(!v.resize(50, false));
    assert_eq!(v, before);
}

#[test]
fn clear_bits_range_on_all_set_vector() {
    let mut v = BitVec::new(1024, true);
    assert!(v.clear_bits(100, 200));
    assert_eq!(v.count_clear_bits(), 101);
    for i in 0..100 {
        assert!(v.is_set(i));
    }
    for i in 201..1024 {
        assert!(v.is_set(i));
    }
}

#[test]
fn and_assign_only_touches_the_overlap() {
    let mut a = BitVec::new(64, true);
    let b = BitVec::new(32, false);
    a.and_assign(&b);
    for i in 0..32 {
        assert!(a.is_clear(i));
    }
    for i in 32..64 {
        assert!(a.is_set(i));
    }
}

#[test]
fn next_set_bit_iterates_in_order() {
    let mut v = BitVec::new(16, false);
    v.set(2);
    v.set(5);
    v.set(15);
    let mut cur = capkit::syskit::bitvec::INVALID_BIT;
    let mut seen = Vec::new();
    loop {
        cur = v.next_set_bit(cur);
        if cur == capkit::syskit::bitvec::INVALID_BIT {
            break;
        }
        seen.push(cur);
    }
    assert_eq!(seen, vec![2, 5, 15]);
}
