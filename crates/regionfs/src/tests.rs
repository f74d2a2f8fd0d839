use std::fs;
use std::thread::sleep;
use std::time::Duration;

use tempfile::tempdir;

use super::*;

fn fs_for(root: &std::path::Path) -> RegionFileSystem {
    RegionFileSystem::new(root, "default", "orders", "abcdef0123456789")
}

#[test]
fn region_dir_follows_the_ns_table_region_layout() {
    let dir = tempdir().unwrap();
    let rfs = fs_for(dir.path());
    assert_eq!(
        rfs.region_dir(),
        dir.path().join("data").join("default").join("orders").join("abcdef0123456789")
    );
}

#[test]
fn for_sibling_shares_root_namespace_and_table() {
    let dir = tempdir().unwrap();
    let rfs = fs_for(dir.path());
    let sibling = rfs.for_sibling("fedcba9876543210");
    assert_eq!(sibling.get_table_dir(), rfs.get_table_dir());
    assert_eq!(
        sibling.region_dir(),
        dir.path().join("data").join("default").join("orders").join("fedcba9876543210")
    );
}

#[test]
fn region_info_round_trips() {
    let dir = tempdir().unwrap();
    let rfs = fs_for(dir.path());
    let info = RegionInfo {
        namespace: "default".into(),
        table: "orders".into(),
        region_encoded_name: "abcdef0123456789".into(),
        region_id: 42,
        start_key: vec![1, 2, 3],
        end_key: vec![9, 9, 9],
    };

    rfs.write_region_info(&info).unwrap();
    let read_back = rfs.read_region_info().unwrap().unwrap();
    assert_eq!(read_back, info);
}

#[test]
fn writing_an_unchanged_region_info_does_not_touch_mtime() {
    let dir = tempdir().unwrap();
    let rfs = fs_for(dir.path());
    let info = RegionInfo {
        namespace: "default".into(),
        table: "orders".into(),
        region_encoded_name: "abcdef0123456789".into(),
        region_id: 1,
        start_key: vec![],
        end_key: vec![],
    };

    rfs.write_region_info(&info).unwrap();
    let mtime_after_create = fs::metadata(rfs.region_dir().join(".regioninfo")).unwrap().modified().unwrap();

    sleep(Duration::from_millis(20));
    rfs.write_region_info(&info).unwrap();
    let mtime_after_reopen = fs::metadata(rfs.region_dir().join(".regioninfo")).unwrap().modified().unwrap();

    assert_eq!(mtime_after_create, mtime_after_reopen);
}

#[test]
fn missing_region_info_reads_as_none() {
    let dir = tempdir().unwrap();
    let rfs = fs_for(dir.path());
    rfs.create_region_dir().unwrap();
    assert!(rfs.read_region_info().unwrap().is_none());
}

#[test]
fn a_staged_store_file_is_invisible_until_committed() {
    let dir = tempdir().unwrap();
    let rfs = fs_for(dir.path());
    let staged = rfs.open_store_file("cf", 7).unwrap();
    fs::write(&staged, b"data").unwrap();

    assert!(rfs.list_families().unwrap().contains(&"cf".to_string()));
    let committed_path = rfs.family_dir("cf").join("00000000000000000007.sf");
    assert!(!committed_path.exists());

    let result = rfs.commit_store_file("cf", 7).unwrap();
    assert_eq!(result, committed_path);
    assert!(committed_path.exists());
    assert!(!staged.exists());
}

#[test]
fn reference_files_are_detected_until_archived_away() {
    let dir = tempdir().unwrap();
    let rfs = fs_for(dir.path());
    assert!(!rfs.has_references("cf").unwrap());

    let ref_path = rfs.create_reference_file("cf", 3, ReferenceSide::Top).unwrap();
    assert!(ref_path.ends_with("00000000000000000003.top.ref"));
    assert!(rfs.has_references("cf").unwrap());
}

#[test]
fn archive_file_moves_it_under_the_archive_tree() {
    let dir = tempdir().unwrap();
    let rfs = fs_for(dir.path());
    let staged = rfs.open_store_file("cf", 1).unwrap();
    fs::write(&staged, b"data").unwrap();
    rfs.commit_store_file("cf", 1).unwrap();

    let archived = rfs.archive_file("cf", "00000000000000000001.sf").unwrap();
    assert!(archived.starts_with(dir.path().join("archive")));
    assert!(archived.exists());
    assert!(!rfs.family_dir("cf").join("00000000000000000001.sf").exists());
}

#[test]
fn snapshot_manifest_round_trips_without_copying_data() {
    let dir = tempdir().unwrap();
    let rfs = fs_for(dir.path());
    let manifest = SnapshotManifest {
        name: "s0".into(),
        table: "orders".into(),
        files: vec![SnapshotFileRef {
            region_encoded_name: "abcdef0123456789".into(),
            family: "cf".into(),
            file_name: "00000000000000000001.sf".into(),
        }],
    };

    rfs.write_snapshot_manifest("s0", &manifest).unwrap();
    let read_back = rfs.read_snapshot_manifest("s0").unwrap();
    assert_eq!(read_back, manifest);
    assert!(!rfs.snapshot_dir("s0").join("00000000000000000001.sf").exists());
}

#[test]
fn corrupt_region_info_is_reported_not_panicked() {
    let dir = tempdir().unwrap();
    let rfs = fs_for(dir.path());
    rfs.create_region_dir().unwrap();
    fs::write(rfs.region_dir().join(".regioninfo"), b"not a region info").unwrap();

    assert!(matches!(rfs.read_region_info(), Err(RegionFsError::CorruptRegionInfo(_))));
}

#[test]
fn list_families_is_empty_for_a_region_never_created() {
    let dir = tempdir().unwrap();
    let rfs = fs_for(dir.path());
    assert!(rfs.list_families().unwrap().is_empty());
}
