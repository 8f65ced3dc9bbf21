//! Storage Invariant Tests
//!
//! - Round trip: a document materializes back equal to what was inserted
//! - Append-then-read: N inserts scan back as N documents in order
//! - Tombstone invisibility: removed records vanish from scans and counts
//!   while the file size stays unchanged
//! - Compaction equivalence: an exported file holds the tombstone-free
//!   document set and nothing else
//! - Corruption is never ignored: unrecognized bytes fail fatally

use std::fs;

use nestdb::document::{json, Document, Value};
use nestdb::store::{NodeTag, Store, StoreErrorCode};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn doc(value: serde_json::Value) -> Document {
    json::document_from_json(&value).expect("fixture document is valid")
}

fn student(name: &str, grades: serde_json::Value) -> Document {
    doc(json!({ "name": name, "grades": grades }))
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn test_insert_then_materialize_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();

    let inserted = doc(json!({
        "name": "Yashar",
        "age": 30,
        "score": 19.5,
        "note": null,
        "address": { "city": "Tehran", "zip": "113" },
        "grades": [12, 10, 19.5, { "course": "maths" }],
        "text": "Ünïcødé \u{0} and \u{1F600}"
    }));

    store.root().insert(&inserted).unwrap();

    let read_back = store.root().element(0).unwrap().as_document().unwrap();
    assert_eq!(read_back, inserted);
}

#[test]
fn test_empty_store_has_zero_count() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    assert_eq!(store.root().count().unwrap(), 0);
    assert!(store.root().as_collection().unwrap().is_empty());
}

#[test]
fn test_store_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");

    {
        let store = Store::open(&path).unwrap();
        store
            .root()
            .insert_many(&[student("Yashar", json!([12])), student("Hasan", json!([13]))])
            .unwrap();
        store.close().unwrap();
    }

    {
        let store = Store::open(&path).unwrap();
        assert_eq!(store.root().count().unwrap(), 2);
        let first = store.root().element(0).unwrap().as_document().unwrap();
        assert_eq!(first.get("name").unwrap(), &Value::from("Yashar"));
    }
}

// =============================================================================
// Append-then-read
// =============================================================================

#[test]
fn test_append_preserves_insertion_order() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    for i in 0..10i64 {
        root.insert(&doc(json!({ "seq": i }))).unwrap();
    }

    assert_eq!(root.count().unwrap(), 10);
    let documents = root.as_collection().unwrap();
    assert_eq!(documents.len(), 10);

    for (i, value) in documents.iter().enumerate() {
        let seq = value.as_object().unwrap().get("seq").unwrap();
        assert_eq!(seq.as_i64().unwrap(), i as i64);
    }
}

#[test]
fn test_batch_insert_matches_single_inserts() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("batch.db")).unwrap();

    let batch: Vec<Document> = (0..5).map(|i| doc(json!({ "seq": i }))).collect();
    store.root().insert_many(&batch).unwrap();

    let other = Store::open(dir.path().join("single.db")).unwrap();
    for item in &batch {
        other.root().insert(item).unwrap();
    }

    assert_eq!(
        store.root().as_collection().unwrap(),
        other.root().as_collection().unwrap()
    );
}

#[test]
fn test_nested_collection_navigation() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    root.insert(&student("Yashar", json!([12, 10]))).unwrap();

    let record = root.element(0).unwrap();
    let grades = record.field("grades").unwrap().unwrap();
    assert_eq!(grades.node_type(), NodeTag::Collection);
    assert_eq!(grades.count().unwrap(), 2);
}

// =============================================================================
// Tombstone invisibility
// =============================================================================

#[test]
fn test_removed_record_is_invisible_but_file_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let store = Store::open(&path).unwrap();
    let root = store.root();

    root.insert_many(&[
        student("Yashar", json!([12, 10, 19.5])),
        student("Hasan", json!([13, 10])),
    ])
    .unwrap();

    let size_before = fs::metadata(&path).unwrap().len();

    let removed = root
        .find_one()
        .eq("name", "Hasan")
        .commit()
        .unwrap()
        .remove()
        .unwrap();
    assert_eq!(removed, 1);

    // Absent from count and scans.
    assert_eq!(root.count().unwrap(), 1);
    let documents = root.as_collection().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(
        documents[0].as_object().unwrap().get("name").unwrap(),
        &Value::from("Yashar")
    );

    // Absent from new queries.
    let matched = root.find_all().eq("name", "Hasan").commit().unwrap();
    assert_eq!(matched.count().unwrap(), 0);

    // Tombstoning reclaims nothing.
    assert_eq!(fs::metadata(&path).unwrap().len(), size_before);
}

#[test]
fn test_removed_record_vanishes_from_prior_query_result() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    root.insert_many(&[
        student("Yashar", json!([12])),
        student("Hasan", json!([13])),
    ])
    .unwrap();

    // Query first, remove afterwards.
    let matched = root.find_all().is_not_null("name").commit().unwrap();
    assert_eq!(matched.count().unwrap(), 2);

    root.find_one()
        .eq("name", "Hasan")
        .commit()
        .unwrap()
        .remove()
        .unwrap();

    // The offset list still has two entries, but the tombstoned record no
    // longer materializes.
    let documents = matched.as_collection().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(
        documents[0].as_object().unwrap().get("name").unwrap(),
        &Value::from("Yashar")
    );
}

#[test]
fn test_remove_field_tombstones_entry() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    root.insert(&student("Yashar", json!([12, 10]))).unwrap();

    let record = root.element(0).unwrap();
    assert!(record.remove_field("grades").unwrap());
    assert!(!record.remove_field("grades").unwrap());

    let read_back = root.element(0).unwrap().as_document().unwrap();
    assert!(!read_back.contains("grades"));
    assert!(read_back.contains("name"));
}

#[test]
fn test_remove_nested_collection_empties_it() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    root.insert(&student("Yashar", json!([12, 10, 19.5]))).unwrap();

    let grades = root.element(0).unwrap().field("grades").unwrap().unwrap();
    assert_eq!(grades.remove().unwrap(), 3);
    assert_eq!(grades.count().unwrap(), 0);

    // The field itself survives as an empty collection.
    let read_back = root.element(0).unwrap().as_document().unwrap();
    assert_eq!(
        read_back.get("grades").unwrap(),
        &Value::Collection(Vec::new())
    );
}

#[test]
fn test_remove_all_from_collection() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    for i in 0..4i64 {
        root.insert(&doc(json!({ "seq": i }))).unwrap();
    }

    assert_eq!(root.remove().unwrap(), 4);
    assert_eq!(root.count().unwrap(), 0);
    assert!(root.as_collection().unwrap().is_empty());
}

// =============================================================================
// Field update
// =============================================================================

#[test]
fn test_set_replaces_field_value() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    root.insert(&student("Yashar", json!([12]))).unwrap();

    let record = root.element(0).unwrap();
    assert_eq!(record.set("grades", &Value::from("replaced")).unwrap(), 1);

    let read_back = root.element(0).unwrap().as_document().unwrap();
    assert_eq!(read_back.get("grades").unwrap(), &Value::from("replaced"));
}

#[test]
fn test_set_adds_missing_field() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    root.insert(&doc(json!({ "name": "Hasan" }))).unwrap();

    let record = root.element(0).unwrap();
    record.set("age", &Value::from(30i64)).unwrap();

    let read_back = root.element(0).unwrap().as_document().unwrap();
    assert_eq!(read_back.get("age").unwrap(), &Value::from(30i64));
}

#[test]
fn test_set_on_collection_updates_every_object() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    root.insert_many(&[
        student("Yashar", json!([12])),
        student("Hasan", json!([13])),
    ])
    .unwrap();

    let updated = root.set("graded", &Value::from(true)).unwrap();
    assert_eq!(updated, 2);

    for value in root.as_collection().unwrap() {
        assert_eq!(
            value.as_object().unwrap().get("graded").unwrap(),
            &Value::from(true)
        );
    }
}

// =============================================================================
// Usage and validation errors
// =============================================================================

#[test]
fn test_wrong_node_type_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    root.insert(&student("Yashar", json!([12]))).unwrap();
    let record = root.element(0).unwrap();

    // Counting an object.
    let err = record.count().unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::NestUsageError);
    assert!(!err.is_fatal());

    // Indexing into an object.
    let err = record.element(0).unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::NestUsageError);

    // Key lookup in a collection.
    let err = root.field("name").unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::NestUsageError);

    // Index out of range.
    let err = root.element(5).unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::NestUsageError);
}

#[test]
fn test_invalid_set_key_rejected_without_mutation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let store = Store::open(&path).unwrap();
    let root = store.root();

    root.insert(&student("Yashar", json!([12]))).unwrap();
    let size_before = fs::metadata(&path).unwrap().len();

    let err = root
        .element(0)
        .unwrap()
        .set("bad key", &Value::from(1i64))
        .unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::NestValidationError);
    assert_eq!(fs::metadata(&path).unwrap().len(), size_before);
}

// =============================================================================
// Corruption is never ignored
// =============================================================================

#[test]
fn test_unrecognized_chain_byte_fails_fatally() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");

    {
        let store = Store::open(&path).unwrap();
        store.root().insert(&student("Yashar", json!([12]))).unwrap();
    }

    // The first chain slot sits right after the root tag and count.
    {
        let mut contents = fs::read(&path).unwrap();
        contents[9] = 0xFF;
        fs::write(&path, contents).unwrap();
    }

    let store = Store::open(&path).unwrap();
    let err = store.root().as_collection().unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::NestFormatCorruption);
    assert!(err.is_fatal());
}

#[test]
fn test_bad_root_tag_fails_fatally() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");

    {
        let store = Store::open(&path).unwrap();
        store.root().insert(&student("Yashar", json!([12]))).unwrap();
    }

    {
        let mut contents = fs::read(&path).unwrap();
        contents[0] = b'X';
        fs::write(&path, contents).unwrap();
    }

    let err = Store::open(&path).unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::NestFormatCorruption);
}

// =============================================================================
// Compaction equivalence
// =============================================================================

#[test]
fn test_export_drops_tombstones_and_preserves_documents() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let compacted_path = dir.path().join("compacted.db");

    let store = Store::open(&path).unwrap();
    let root = store.root();

    root.insert_many(&[
        student("Yashar", json!([12, 10, 19.5])),
        student("Hasan", json!([13, 10])),
        student("Omid", json!([])),
    ])
    .unwrap();

    // Tombstone the middle record and one nested field.
    root.find_one()
        .eq("name", "Hasan")
        .commit()
        .unwrap()
        .remove()
        .unwrap();
    root.element(1).unwrap().remove_field("grades").unwrap();

    let live_before = root.as_collection().unwrap();

    root.export(&compacted_path).unwrap();

    let compacted = Store::open(&compacted_path).unwrap();
    assert_eq!(compacted.root().count().unwrap(), 2);
    assert_eq!(compacted.root().as_collection().unwrap(), live_before);

    // Tombstoned bytes are gone: the compacted file is strictly smaller.
    assert!(
        fs::metadata(&compacted_path).unwrap().len() < fs::metadata(&path).unwrap().len()
    );

    // A second compaction changes nothing: no tombstones remain.
    let recompacted_path = dir.path().join("recompacted.db");
    compacted.root().export(&recompacted_path).unwrap();
    assert_eq!(
        fs::metadata(&compacted_path).unwrap().len(),
        fs::metadata(&recompacted_path).unwrap().len()
    );
}

#[test]
fn test_export_of_filtered_view_writes_only_matches() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    root.insert_many(&[
        student("Yashar", json!([12, 10, 19.5])),
        student("Hasan", json!([13, 10])),
    ])
    .unwrap();

    let matched = root.find_all().eq("name", "Yashar").commit().unwrap();
    let exported_path = dir.path().join("matches.db");
    matched.export(&exported_path).unwrap();

    let exported = Store::open(&exported_path).unwrap();
    assert_eq!(exported.root().count().unwrap(), 1);
    let documents = exported.root().as_collection().unwrap();
    assert_eq!(
        documents[0].as_object().unwrap().get("name").unwrap(),
        &Value::from("Yashar")
    );
}
