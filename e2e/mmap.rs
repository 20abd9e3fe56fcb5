//! End-to-end tests for the multi-view memory-mapped file.

use capkit::MappedFile;

#[test]
fn num_maps_and_offsets_match_view_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("three-views.bin");
    let view = 64u32;
    let total = (view as u64) * 3 - 10;
    let file = MappedFile::create(&path, total, true, view).unwrap();

    assert_eq!(file.num_maps(), 3);
    assert_eq!(file.offset(0), 0);
    for i in 0..file.num_maps() as usize - 1 {
        assert_eq!(file.offset(i + 1) - file.offset(i), view as u64);
    }
}

#[test]
fn set_then_get_bytes_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.bin");
    let mut file = MappedFile::create(&path, 256, true, 0).unwrap();

    let buf = b"the quick brown fox";
    assert!(file.set_bytes(100, buf, false));
    let mut out = vec![0u8; buf.len()];
    file.get_bytes(&mut out, 100, buf.len());
    assert_eq!(&out, buf);
}

#[test]
fn copy_bytes_handles_overlap_correctly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overlap.bin");
    let mut file = MappedFile::create(&path, 64, true, 0).unwrap();

    let buf: Vec<u8> = (0..20u8).collect();
    file.set_bytes(0, &buf, false);
    // Shift [0,20) right by 5 bytes; destination and source overlap.
    file.copy_bytes(5, 0, 20);

    let mut out = vec![0u8; 20];
    file.get_bytes(&mut out, 5, 20);
    assert_eq!(out, buf);
}

#[test]
fn read_only_file_rejects_resize() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ro.bin");
    {
        MappedFile::create(&path, 32, true, 0).unwrap();
    }
    let mut file = MappedFile::open(&path, true, 0).unwrap();
    assert!(!file.resize(64));
}

#[test]
fn cross_view_boundary_read_spans_two_views() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("boundary.bin");
    let view = 16u32;
    let mut file = MappedFile::create(&path, (view as u64) * 2, true, view).unwrap();

    let buf: Vec<u8> = (0..8u8).collect();
    file.set_bytes(view as u64 - 4, &buf, false);
    let mut out = vec![0u8; 8];
    file.get_bytes(&mut out, view as u64 - 4, 8);
    assert_eq!(out, buf);
}
