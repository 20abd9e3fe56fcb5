//! End-to-end tests for the PKZip reader/writer pair.
//!
//! `KMLSample.kml`/`.kmz` name the archive used by the documented round-trip
//! scenario; no such binary fixture ships in this workspace, so the archive
//! is synthesized in-test instead.

use std::fs;

use capkit::{RoZipped, Zipped};

#[test]
fn kml_sample_round_trips_through_zipped_and_ro_zipped() {
    let dir = tempfile::tempdir().unwrap();
    let kml_path = dir.path().join("KMLSample.kml");
    let contents = b"<?xml version=\"1.0\"?><kml>sample placemark data</kml>";
    fs::write(&kml_path, contents).unwrap();

    let archive_path = dir.path().join("KMLSample.kmz");
    let mut zipped = Zipped::create(&archive_path, 0).unwrap();
    assert!(zipped.add_item(&kml_path, -1).unwrap());
    zipped.save("KMLSample").unwrap();

    let archive = RoZipped::open(&archive_path, 0).unwrap();
    assert_eq!(archive.num_items(), 1);
    assert_eq!(archive.comment(), "KMLSample");
    assert_eq!(archive.item(0), "KMLSample.kml");
    assert_eq!(archive.size(0), contents.len() as u64);

    let out_dir = dir.path().join("out");
    assert!(archive.extract(&out_dir, "KMLSample.kml", false).unwrap());
    let extracted = fs::read(out_dir.join("KMLSample.kml")).unwrap();
    assert_eq!(extracted, contents);
}

#[test]
fn extract_all_visits_every_member() {
    let dir = tempfile::tempdir().unwrap();
    let src_dir = dir.path().join("src");
    fs::create_dir(&src_dir).unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        fs::write(src_dir.join(name), format!("contents of {name}")).unwrap();
    }

    let archive_path = dir.path().join("multi.zip");
    let mut zipped = Zipped::create(&archive_path, 0).unwrap();
    assert!(zipped.add_directory(&src_dir, 6).unwrap());
    zipped.save("").unwrap();

    let archive = RoZipped::open(&archive_path, 0).unwrap();
    assert_eq!(archive.num_items(), 3);

    let out_dir = dir.path().join("out");
    assert!(archive.extract_all(&out_dir, true).unwrap());
    for name in ["a.txt", "b.txt", "c.txt"] {
        let got = fs::read_to_string(out_dir.join(name)).unwrap();
        assert_eq!(got, format!("contents of {name}"));
    }
}

#[test]
fn cancelling_on_the_first_chunk_stops_extraction_and_sets_the_flag() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("big.bin");
    fs::write(&src, vec![7u8; 64 * 1024]).unwrap();

    let archive_path = dir.path().join("cancel.zip");
    let mut zipped = Zipped::create(&archive_path, 0).unwrap();
    zipped.add_item(&src, -1).unwrap();
    zipped.save("").unwrap();

    let archive = RoZipped::open(&archive_path, 0).unwrap();
    archive.monitor_extraction(Some(Box::new(|_items, _total, _bytes, _total_bytes| false)));

    let out_dir = dir.path().join("out");
    let result = archive.extract(&out_dir, "big.bin", false).unwrap();
    assert!(!result);
    assert!(archive.extraction_canceled());
}

#[test]
fn cancelling_on_the_last_item_stops_extract_all_with_flag_set() {
    let dir = tempfile::tempdir().unwrap();
    let src_dir = dir.path().join("src");
    fs::create_dir(&src_dir).unwrap();
    for name in ["1.txt", "2.txt", "3.txt"] {
        fs::write(src_dir.join(name), "x").unwrap();
    }

    let archive_path = dir.path().join("cancel_all.zip");
    let mut zipped = Zipped::create(&archive_path, 0).unwrap();
    zipped.add_directory(&src_dir, -1).unwrap();
    zipped.save("").unwrap();

    let archive = RoZipped::open(&archive_path, 0).unwrap();
    let total_items = archive.num_items() as u32;
    let canceled_at = total_items - 1;
    archive.monitor_extraction(Some(Box::new(move |items_extracted, _total, _bytes, _total_bytes| items_extracted != canceled_at)));

    let out_dir = dir.path().join("out");
    let result = archive.extract_all(&out_dir, true).unwrap();
    assert!(!result);
    assert!(archive.extraction_canceled());
}
