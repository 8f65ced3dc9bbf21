//! Query Invariant Tests
//!
//! - Filter correctness: equality, existence ("within"), cardinality and
//!   null checks against the canonical two-student fixture
//! - Find-one semantics: at most one match, scan stops at the first
//!   acceptance (observable through the records-seen counter)
//! - Offset-list scaling: identical results whether the query result is
//!   memory-backed or spilled to the auxiliary file
//! - Conjunction / disjunction child-driving

use nestdb::document::{json, Document, Value};
use nestdb::store::{Store, StoreErrorCode, StoreOptions};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn doc(value: serde_json::Value) -> Document {
    json::document_from_json(&value).expect("fixture document is valid")
}

/// The canonical fixture: two students with scalar grade collections.
fn insert_students(store: &Store) {
    store
        .root()
        .insert_many(&[
            doc(json!({ "name": "Yashar", "grades": [12, 10, 19.5] })),
            doc(json!({ "name": "Hasan", "grades": [13, 10] })),
        ])
        .unwrap();
}

fn names(view: &nestdb::store::View<'_>) -> Vec<String> {
    view.as_collection()
        .unwrap()
        .iter()
        .map(|value| {
            value
                .as_object()
                .unwrap()
                .get("name")
                .unwrap()
                .as_text()
                .unwrap()
                .to_string()
        })
        .collect()
}

// =============================================================================
// Filter correctness
// =============================================================================

#[test]
fn test_equality_returns_exactly_the_matching_document() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    insert_students(&store);

    let matched = store.root().find_all().eq("name", "Yashar").commit().unwrap();
    assert_eq!(matched.count().unwrap(), 1);
    assert_eq!(names(&matched), vec!["Yashar"]);
}

#[test]
fn test_numeric_comparisons() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    for age in [15i64, 25, 40, 70] {
        root.insert(&doc(json!({ "age": age }))).unwrap();
    }

    assert_eq!(root.find_all().gt("age", 18i64).commit().unwrap().count().unwrap(), 3);
    assert_eq!(root.find_all().le("age", 25i64).commit().unwrap().count().unwrap(), 2);
    assert_eq!(root.find_all().ne("age", 40i64).commit().unwrap().count().unwrap(), 3);
}

#[test]
fn test_within_matches_scalar_elements() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    insert_students(&store);

    // Only Yashar's grades contain 19.5.
    let matched = store
        .root()
        .find_all()
        .within("grades")
        .element()
        .eq(19.5)
        .commit()
        .unwrap();
    assert_eq!(names(&matched), vec!["Yashar"]);

    // 10 appears in both grade collections.
    let matched = store
        .root()
        .find_all()
        .within("grades")
        .element()
        .eq(10i64)
        .commit()
        .unwrap();
    assert_eq!(matched.count().unwrap(), 2);
}

#[test]
fn test_within_matches_object_elements() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    store
        .root()
        .insert_many(&[
            doc(json!({
                "name": "Yashar",
                "grades": [12, 10, { "course": "maths" }]
            })),
            doc(json!({
                "name": "Hasan",
                "grades": [13, { "course": "chem" }]
            })),
        ])
        .unwrap();

    let matched = store
        .root()
        .find_all()
        .within("grades")
        .eq("course", "chem")
        .commit()
        .unwrap();
    assert_eq!(names(&matched), vec!["Hasan"]);
}

#[test]
fn test_cardinality_filter() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    insert_students(&store);

    let matched = store
        .root()
        .find_all()
        .count("grades")
        .eq(3)
        .commit()
        .unwrap();
    assert_eq!(names(&matched), vec!["Yashar"]);

    let matched = store
        .root()
        .find_all()
        .count("grades")
        .lt(3)
        .commit()
        .unwrap();
    assert_eq!(names(&matched), vec!["Hasan"]);
}

#[test]
fn test_is_null_matches_missing_fields() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    insert_students(&store);

    // A field nobody has resolves to null for every record.
    let matched = store
        .root()
        .find_all()
        .is_null("missingField")
        .commit()
        .unwrap();
    assert_eq!(matched.count().unwrap(), 2);

    let matched = store
        .root()
        .find_all()
        .is_not_null("name")
        .commit()
        .unwrap();
    assert_eq!(matched.count().unwrap(), 2);
}

#[test]
fn test_null_check_distinguishes_stored_null_from_value() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    root.insert_many(&[
        doc(json!({ "name": "a", "note": null })),
        doc(json!({ "name": "b", "note": "text" })),
    ])
    .unwrap();

    let matched = root.find_all().is_null("note").commit().unwrap();
    assert_eq!(names(&matched), vec!["a"]);

    let matched = root.find_all().is_not_null("note").commit().unwrap();
    assert_eq!(names(&matched), vec!["b"]);
}

#[test]
fn test_dotted_path_resolves_nested_fields() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    root.insert_many(&[
        doc(json!({ "name": "a", "address": { "city": "Tehran" } })),
        doc(json!({ "name": "b", "address": { "city": "Shiraz" } })),
        doc(json!({ "name": "c" })),
    ])
    .unwrap();

    let matched = root
        .find_all()
        .eq("address.city", "Tehran")
        .commit()
        .unwrap();
    assert_eq!(names(&matched), vec!["a"]);

    // A broken path segment is "not found", which only null checks match.
    let matched = root.find_all().is_null("address.city").commit().unwrap();
    assert_eq!(names(&matched), vec!["c"]);
}

#[test]
fn test_comparison_never_matches_nested_nodes() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    root.insert(&doc(json!({ "name": "a", "grades": [1, 2] })))
        .unwrap();

    // "grades" resolves to a collection node; comparisons reject it.
    let matched = root.find_all().eq("grades", "anything").commit().unwrap();
    assert_eq!(matched.count().unwrap(), 0);
}

// =============================================================================
// Conjunction / disjunction
// =============================================================================

#[test]
fn test_and_group_requires_every_predicate() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    for (name, age) in [("a", 15i64), ("b", 30), ("c", 45), ("d", 70)] {
        root.insert(&doc(json!({ "name": name, "age": age }))).unwrap();
    }

    let matched = root
        .find_all()
        .and()
        .gt("age", 18i64)
        .lt("age", 60i64)
        .close()
        .commit()
        .unwrap();
    assert_eq!(names(&matched), vec!["b", "c"]);
}

#[test]
fn test_or_group_matches_any_predicate() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    insert_students(&store);

    let matched = store
        .root()
        .find_all()
        .or()
        .eq("name", "Yashar")
        .eq("name", "Hasan")
        .close()
        .commit()
        .unwrap();
    assert_eq!(matched.count().unwrap(), 2);
}

#[test]
fn test_and_group_pools_distinct_fields() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    insert_students(&store);

    let matched = store
        .root()
        .find_all()
        .and()
        .eq("name", "Yashar")
        .count("grades")
        .eq(3)
        .close()
        .commit()
        .unwrap();
    assert_eq!(names(&matched), vec!["Yashar"]);

    let matched = store
        .root()
        .find_all()
        .and()
        .eq("name", "Hasan")
        .count("grades")
        .eq(3)
        .close()
        .commit()
        .unwrap();
    assert_eq!(matched.count().unwrap(), 0);
}

#[test]
fn test_unbalanced_builder_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    insert_students(&store);

    // close() without a group.
    let err = store
        .root()
        .find_all()
        .eq("name", "Yashar")
        .close()
        .commit()
        .unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::NestValidationError);

    // within() without a predicate.
    let err = store
        .root()
        .find_all()
        .within("grades")
        .commit()
        .unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::NestValidationError);

    // No predicate at all.
    let err = store.root().find_all().commit().unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::NestValidationError);
}

// =============================================================================
// Find-one semantics
// =============================================================================

#[test]
fn test_find_one_yields_at_most_one_match() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    for i in 0..5i64 {
        root.insert(&doc(json!({ "flag": "x", "seq": i }))).unwrap();
    }

    let matched = root.find_one().eq("flag", "x").commit().unwrap();
    assert_eq!(matched.count().unwrap(), 1);

    // All five records qualify, but only the first is kept.
    let seq = matched.element(0).unwrap().as_document().unwrap();
    assert_eq!(seq.get("seq").unwrap().as_i64().unwrap(), 0);
}

#[test]
fn test_find_one_terminates_at_first_acceptance() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    for i in 0..10i64 {
        root.insert(&doc(json!({ "seq": i }))).unwrap();
    }

    // The third record (seq == 2) is the first match; the scan must not
    // look past it.
    let matched = root.find_one().eq("seq", 2i64).commit().unwrap();
    assert_eq!(matched.count().unwrap(), 1);
    assert_eq!(matched.records_seen(), Some(3));

    // A find-all over the same data reviews everything.
    let all = root.find_all().eq("seq", 2i64).commit().unwrap();
    assert_eq!(all.records_seen(), Some(10));
}

// =============================================================================
// Filtered views
// =============================================================================

#[test]
fn test_filtered_view_indexing_and_chaining() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    for i in 0..6i64 {
        let group = if i % 2 == 0 { "even" } else { "odd" };
        root.insert(&doc(json!({ "seq": i, "group": group }))).unwrap();
    }

    let evens = root.find_all().eq("group", "even").commit().unwrap();
    assert_eq!(evens.count().unwrap(), 3);

    let second = evens.element(1).unwrap().as_document().unwrap();
    assert_eq!(second.get("seq").unwrap().as_i64().unwrap(), 2);

    // Querying a filtered view scans only its records.
    let refined = evens.find_all().gt("seq", 0i64).commit().unwrap();
    assert_eq!(refined.count().unwrap(), 2);
    assert_eq!(refined.records_seen(), Some(3));
}

#[test]
fn test_remove_through_filtered_view() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    let root = store.root();

    for i in 0..6i64 {
        let group = if i % 2 == 0 { "even" } else { "odd" };
        root.insert(&doc(json!({ "seq": i, "group": group }))).unwrap();
    }

    let odds = root.find_all().eq("group", "odd").commit().unwrap();
    assert_eq!(odds.remove().unwrap(), 3);

    assert_eq!(root.count().unwrap(), 3);
    for value in root.as_collection().unwrap() {
        assert_eq!(
            value.as_object().unwrap().get("group").unwrap(),
            &Value::from("even")
        );
    }
}

#[test]
fn test_insert_into_filtered_view_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("test.db")).unwrap();
    insert_students(&store);

    let matched = store.root().find_all().eq("name", "Yashar").commit().unwrap();
    let err = matched.insert(&doc(json!({ "name": "Omid" }))).unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::NestUsageError);
}

// =============================================================================
// Offset-list scaling
// =============================================================================

#[test]
fn test_spilled_result_matches_in_memory_result() {
    let dir = TempDir::new().unwrap();

    let build = |name: &str, options: StoreOptions| -> Vec<i64> {
        let store = Store::open_with(dir.path().join(name), options).unwrap();
        let root = store.root();
        for i in 0..50i64 {
            root.insert(&doc(json!({ "seq": i }))).unwrap();
        }

        let matched = root.find_all().ge("seq", 10i64).commit().unwrap();
        assert_eq!(matched.count().unwrap(), 40);

        (0..40u64)
            .map(|i| {
                matched
                    .element(i)
                    .unwrap()
                    .as_document()
                    .unwrap()
                    .get("seq")
                    .unwrap()
                    .as_i64()
                    .unwrap()
            })
            .collect()
    };

    // Force the second run to spill after 8 offsets.
    let in_memory = build("memory.db", StoreOptions::default());
    let spilled = build("spilled.db", StoreOptions::new().spill_threshold(8));
    assert_eq!(in_memory, spilled);
    assert_eq!(in_memory, (10..50).collect::<Vec<_>>());
}

#[test]
fn test_spill_file_cleaned_up_after_view_drops() {
    let dir = TempDir::new().unwrap();
    let store =
        Store::open_with(dir.path().join("test.db"), StoreOptions::new().spill_threshold(4))
            .unwrap();
    let root = store.root();

    for i in 0..20i64 {
        root.insert(&doc(json!({ "seq": i }))).unwrap();
    }

    {
        let matched = root.find_all().is_not_null("seq").commit().unwrap();
        assert_eq!(matched.count().unwrap(), 20);
        // Store file plus one spill file.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    // Only the store file remains.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}
