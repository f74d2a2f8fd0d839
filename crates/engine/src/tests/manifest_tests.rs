use crate::manifest::NodeManifest;

#[test]
fn save_then_load_round_trips_entries_and_families() {
    let root = tempfile::tempdir().unwrap();
    let mut manifest = NodeManifest::load_or_create(root.path(), "default", "orders").unwrap();
    manifest.add("0000000000000001".to_string(), vec!["cf".to_string(), "other".to_string()]);
    manifest.save().unwrap();

    let reloaded = NodeManifest::load_or_create(root.path(), "default", "orders").unwrap();
    assert_eq!(reloaded.entries.len(), 1);
    assert_eq!(reloaded.entries[0].encoded_name, "0000000000000001");
    assert_eq!(reloaded.entries[0].families, vec!["cf".to_string(), "other".to_string()]);
}

#[test]
fn add_replaces_an_existing_entry_for_the_same_region() {
    let root = tempfile::tempdir().unwrap();
    let mut manifest = NodeManifest::load_or_create(root.path(), "default", "orders").unwrap();
    manifest.add("0000000000000001".to_string(), vec!["cf".to_string()]);
    manifest.add("0000000000000001".to_string(), vec!["cf".to_string(), "other".to_string()]);

    assert_eq!(manifest.entries.len(), 1);
    assert_eq!(manifest.entries[0].families, vec!["cf".to_string(), "other".to_string()]);
}

#[test]
fn remove_drops_the_entry() {
    let root = tempfile::tempdir().unwrap();
    let mut manifest = NodeManifest::load_or_create(root.path(), "default", "orders").unwrap();
    manifest.add("0000000000000001".to_string(), vec!["cf".to_string()]);
    manifest.remove("0000000000000001");
    assert!(manifest.entries.is_empty());
}

#[test]
fn loading_a_fresh_table_starts_empty() {
    let root = tempfile::tempdir().unwrap();
    let manifest = NodeManifest::load_or_create(root.path(), "default", "new_table").unwrap();
    assert!(manifest.entries.is_empty());
}
