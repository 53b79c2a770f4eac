// crates/plugstore-store-sqlite/tests/sqlite_store_unit.rs
// ============================================================================
// Module: SQLite Store Unit Tests
// Description: Targeted tests for the SQLite registry and row store.
// Purpose: Validate plugin isolation, schema immutability, atomic updates,
//          filter execution, and store metadata handling.
// ============================================================================

//! ## Overview
//! Unit-level tests for `SQLite` store invariants:
//! - Plugin namespaces never share physical tables
//! - Registered schemas are immutable; identical re-registration is a no-op
//! - Concurrent `$inc` operations never lose updates
//! - Missing rows report `false` instead of failing
//! - Filters, sort, and limit execute as compiled

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::thread;

use plugstore_core::FieldDef;
use plugstore_core::FieldType;
use plugstore_core::PluginId;
use plugstore_core::RegisterOutcome;
use plugstore_core::RowData;
use plugstore_core::RowId;
use plugstore_core::RowStore;
use plugstore_core::SchemaRegistry;
use plugstore_core::StoreError;
use plugstore_core::TableName;
use plugstore_core::TableSchema;
use plugstore_core::UpdatePlan;
use plugstore_core::build_search;
use plugstore_core::parse_operations;
use plugstore_core::plan_insert;
use plugstore_core::plan_update;
use plugstore_store_sqlite::SqliteDatabase;
use plugstore_store_sqlite::SqliteRowStore;
use plugstore_store_sqlite::SqliteSchemaRegistry;
use plugstore_store_sqlite::SqliteStoreConfig;
use plugstore_store_sqlite::SqliteStoreError;
use rusqlite::Connection;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

struct Fixture {
    _dir: TempDir,
    config: SqliteStoreConfig,
    registry: SqliteSchemaRegistry,
    rows: SqliteRowStore,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let config = SqliteStoreConfig::at(dir.path().join("plugstore.db"));
    let db = SqliteDatabase::open(&config).unwrap();
    let registry = SqliteSchemaRegistry::new(db.clone()).unwrap();
    let rows = SqliteRowStore::new(db);
    Fixture {
        _dir: dir,
        config,
        registry,
        rows,
    }
}

fn quotes(plugin: &str) -> TableSchema {
    TableSchema::new(
        PluginId::parse(plugin).unwrap(),
        TableName::parse("quotes").unwrap(),
        vec![
            FieldDef::new("text", FieldType::String).required(),
            FieldDef::new("author", FieldType::String),
            FieldDef::new("score", FieldType::Integer).with_default(json!(0)),
            FieldDef::new("ratio", FieldType::Float),
            FieldDef::new("pinned", FieldType::Boolean),
            FieldDef::new("meta", FieldType::Json),
        ],
    )
    .unwrap()
}

fn insert(rows: &SqliteRowStore, schema: &TableSchema, data: &Value) -> RowId {
    rows.insert(schema, &plan_insert(schema, data).unwrap()).unwrap()
}

fn apply(rows: &SqliteRowStore, schema: &TableSchema, id: RowId, ops: &Value) -> Result<bool, StoreError> {
    rows.apply_operations(schema, id, &parse_operations(schema, ops).unwrap())
}

fn search(rows: &SqliteRowStore, schema: &TableSchema, request: &Value) -> Vec<RowData> {
    let query = build_search(
        schema,
        request.get("filters"),
        request.get("sort"),
        request.get("limit"),
        1_000,
    )
    .unwrap();
    rows.search(schema, &query).unwrap()
}

fn texts(rows: &[RowData]) -> Vec<&str> {
    rows.iter().map(|row| row["text"].as_str().unwrap()).collect()
}

// ============================================================================
// SECTION: Registry
// ============================================================================

#[test]
fn register_is_idempotent_and_immutable() {
    let fx = fixture();
    let schema = quotes("alpha");
    assert_eq!(fx.registry.register(schema.clone()).unwrap(), RegisterOutcome::Created);
    assert_eq!(fx.registry.register(schema.clone()).unwrap(), RegisterOutcome::Unchanged);

    let mut changed = schema.clone();
    changed.fields.push(FieldDef::new("extra", FieldType::String));
    let err = fx.registry.register(changed).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let stored = fx.registry.lookup(&schema.plugin_id, &schema.table_name).unwrap().unwrap();
    assert!(stored.same_definition(&schema));
}

#[test]
fn plugins_with_same_table_name_are_isolated() {
    let fx = fixture();
    let alpha = quotes("alpha");
    let beta = quotes("beta");
    fx.registry.register(alpha.clone()).unwrap();
    fx.registry.register(beta.clone()).unwrap();

    insert(&fx.rows, &alpha, &json!({"text": "from alpha"}));
    insert(&fx.rows, &alpha, &json!({"text": "again alpha"}));
    insert(&fx.rows, &beta, &json!({"text": "from beta"}));

    assert_eq!(texts(&search(&fx.rows, &alpha, &json!({}))), vec!["from alpha", "again alpha"]);
    assert_eq!(texts(&search(&fx.rows, &beta, &json!({}))), vec!["from beta"]);

    let other = PluginId::parse("gamma").unwrap();
    assert!(fx.registry.lookup(&other, &alpha.table_name).unwrap().is_none());
    assert!(fx.registry.list(&other).unwrap().is_empty());
    assert_eq!(fx.registry.list(&alpha.plugin_id).unwrap().len(), 1);
}

#[test]
fn registry_cache_is_warmed_on_reopen() {
    let fx = fixture();
    let schema = quotes("alpha");
    fx.registry.register(schema.clone()).unwrap();

    let db = SqliteDatabase::open(&fx.config).unwrap();
    let reopened = SqliteSchemaRegistry::new(db).unwrap();
    let stored = reopened.list(&schema.plugin_id).unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].same_definition(&schema));
}

#[test]
fn reserved_engine_prefix_is_rejected() {
    let fx = fixture();
    let err = fx.registry.register(quotes("sqlite")).unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
}

// ============================================================================
// SECTION: Rows
// ============================================================================

#[test]
fn quotes_scenario_round_trip() {
    let fx = fixture();
    let schema = quotes("alpha");
    fx.registry.register(schema.clone()).unwrap();

    let id = insert(&fx.rows, &schema, &json!({"text": "hi", "author": "Bob"}));
    assert_eq!(id.get(), 1);
    let row = fx.rows.select(&schema, id).unwrap().unwrap();
    assert_eq!(row["score"], json!(0));
    assert_eq!(row["author"], json!("Bob"));
    assert_eq!(row["meta"], Value::Null);
    assert_eq!(row["created_at"], row["updated_at"]);

    assert!(apply(&fx.rows, &schema, id, &json!({"score": {"$inc": 5}})).unwrap());
    assert_eq!(fx.rows.select(&schema, id).unwrap().unwrap()["score"], json!(5));

    let hits = search(&fx.rows, &schema, &json!({"filters": {"score": {"$gte": 5}}}));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["id"], json!(1));

    assert!(fx.rows.delete(&schema, id).unwrap());
    assert!(fx.rows.select(&schema, id).unwrap().is_none());
}

#[test]
fn missing_rows_report_false() {
    let fx = fixture();
    let schema = quotes("alpha");
    fx.registry.register(schema.clone()).unwrap();
    let missing = RowId::new(42);

    assert!(fx.rows.select(&schema, missing).unwrap().is_none());
    assert!(!apply(&fx.rows, &schema, missing, &json!({"score": {"$inc": 1}})).unwrap());
    let UpdatePlan::Fields(fields) = plan_update(&schema, Some(&json!({"author": "x"})), None).unwrap() else {
        panic!("expected field update");
    };
    assert!(!fx.rows.update_fields(&schema, missing, &fields).unwrap());
    assert!(!fx.rows.delete(&schema, missing).unwrap());
}

#[test]
fn typed_values_round_trip() {
    let fx = fixture();
    let schema = quotes("alpha");
    fx.registry.register(schema.clone()).unwrap();
    let id = insert(
        &fx.rows,
        &schema,
        &json!({"text": "it's \"quoted\"", "ratio": 0.25, "pinned": true, "meta": {"tags": ["a"]}}),
    );
    let row = fx.rows.select(&schema, id).unwrap().unwrap();
    assert_eq!(row["text"], json!("it's \"quoted\""));
    assert_eq!(row["ratio"], json!(0.25));
    assert_eq!(row["pinned"], json!(true));
    assert_eq!(row["meta"], json!({"tags": ["a"]}));
}

#[test]
fn field_update_refreshes_updated_at() {
    let fx = fixture();
    let schema = quotes("alpha");
    fx.registry.register(schema.clone()).unwrap();
    let id = insert(&fx.rows, &schema, &json!({"text": "hi"}));
    let before = fx.rows.select(&schema, id).unwrap().unwrap();
    thread::sleep(std::time::Duration::from_millis(5));
    let UpdatePlan::Fields(fields) = plan_update(&schema, Some(&json!({"author": "Ann"})), None).unwrap() else {
        panic!("expected field update");
    };
    assert!(fx.rows.update_fields(&schema, id, &fields).unwrap());
    let after = fx.rows.select(&schema, id).unwrap().unwrap();
    assert_eq!(after["author"], json!("Ann"));
    assert_eq!(after["created_at"], before["created_at"]);
    assert!(after["updated_at"].as_str().unwrap() > before["updated_at"].as_str().unwrap());
}

// ============================================================================
// SECTION: Atomic Operators
// ============================================================================

#[test]
fn concurrent_increments_never_lose_updates() {
    let fx = fixture();
    let schema = Arc::new(quotes("alpha"));
    fx.registry.register((*schema).clone()).unwrap();
    let id = insert(&fx.rows, &schema, &json!({"text": "counter"}));
    let rows = Arc::new(fx.rows.clone());

    let handles: Vec<_> = (0 .. 8)
        .map(|_| {
            let rows = Arc::clone(&rows);
            let schema = Arc::clone(&schema);
            thread::spawn(move || {
                for _ in 0 .. 25 {
                    assert!(apply(&rows, &schema, id, &json!({"score": {"$inc": 1}})).unwrap());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(rows.select(&schema, id).unwrap().unwrap()["score"], json!(200));
}

#[test]
fn operators_apply_together_and_treat_null_as_zero() {
    let fx = fixture();
    let schema = quotes("alpha");
    fx.registry.register(schema.clone()).unwrap();
    let id = insert(&fx.rows, &schema, &json!({"text": "hi", "score": 10}));

    assert!(
        apply(
            &fx.rows,
            &schema,
            id,
            &json!({"score": {"$mul": 3}, "ratio": {"$inc": 1.5}, "author": {"$set": "Zed"}}),
        )
        .unwrap()
    );
    let row = fx.rows.select(&schema, id).unwrap().unwrap();
    assert_eq!(row["score"], json!(30));
    assert_eq!(row["ratio"], json!(1.5));
    assert_eq!(row["author"], json!("Zed"));

    apply(&fx.rows, &schema, id, &json!({"score": {"$max": 20}})).unwrap();
    assert_eq!(fx.rows.select(&schema, id).unwrap().unwrap()["score"], json!(30));
    apply(&fx.rows, &schema, id, &json!({"score": {"$min": 20}})).unwrap();
    assert_eq!(fx.rows.select(&schema, id).unwrap().unwrap()["score"], json!(20));
    apply(&fx.rows, &schema, id, &json!({"score": {"$dec": 25}})).unwrap();
    assert_eq!(fx.rows.select(&schema, id).unwrap().unwrap()["score"], json!(-5));
}

#[test]
fn overflow_fails_and_leaves_row_untouched() {
    let fx = fixture();
    let schema = quotes("alpha");
    fx.registry.register(schema.clone()).unwrap();
    let id = insert(&fx.rows, &schema, &json!({"text": "hi", "score": i64::MAX}));

    let result = apply(&fx.rows, &schema, id, &json!({"score": {"$inc": 1}, "author": {"$set": "x"}}));
    assert!(matches!(result, Err(StoreError::Db(_))));
    let row = fx.rows.select(&schema, id).unwrap().unwrap();
    assert_eq!(row["score"], json!(i64::MAX));
    assert_eq!(row["author"], Value::Null);
}

#[test]
fn float_operators_update_in_place() {
    let fx = fixture();
    let schema = quotes("alpha");
    fx.registry.register(schema.clone()).unwrap();
    let id = insert(&fx.rows, &schema, &json!({"text": "hi", "ratio": 1.5}));
    let blank = insert(&fx.rows, &schema, &json!({"text": "blank"}));

    let steps = [
        (json!({"ratio": {"$mul": 2.0}}), 3.0),
        (json!({"ratio": {"$inc": 0.25}}), 3.25),
        (json!({"ratio": {"$dec": 1.25}}), 2.0),
        (json!({"ratio": {"$max": 2.5}}), 2.5),
        (json!({"ratio": {"$max": 1.0}}), 2.5),
        (json!({"ratio": {"$min": 1.0}}), 1.0),
    ];
    for (ops, expected) in steps {
        assert!(apply(&fx.rows, &schema, id, &ops).unwrap());
        let row = fx.rows.select(&schema, id).unwrap().unwrap();
        assert_eq!(row["ratio"], json!(expected), "after {ops}");
    }

    assert!(apply(&fx.rows, &schema, blank, &json!({"ratio": {"$inc": 0.5}})).unwrap());
    let row = fx.rows.select(&schema, blank).unwrap().unwrap();
    assert_eq!(row["ratio"], json!(0.5));
}

#[test]
fn float_overflow_fails_and_keeps_table_readable() {
    let fx = fixture();
    let schema = quotes("alpha");
    fx.registry.register(schema.clone()).unwrap();
    let big = insert(&fx.rows, &schema, &json!({"text": "big", "ratio": 1e308}));
    let low = insert(&fx.rows, &schema, &json!({"text": "low", "ratio": -1e308}));

    let overflowing = [
        (big, json!({"ratio": {"$mul": 10.0}, "author": {"$set": "x"}})),
        (big, json!({"ratio": {"$inc": 1e308}})),
        (low, json!({"ratio": {"$dec": 1e308}})),
        (low, json!({"ratio": {"$mul": 1e10}})),
    ];
    for (id, ops) in overflowing {
        let result = apply(&fx.rows, &schema, id, &ops);
        match result {
            Err(StoreError::Db(message)) => assert!(message.contains("ratio"), "{message}"),
            other => panic!("expected overflow failure for {ops}, got {other:?}"),
        }
    }

    let row = fx.rows.select(&schema, big).unwrap().unwrap();
    assert_eq!(row["ratio"], json!(1e308));
    assert_eq!(row["author"], Value::Null);
    let row = fx.rows.select(&schema, low).unwrap().unwrap();
    assert_eq!(row["ratio"], json!(-1e308));
    let hits = search(&fx.rows, &schema, &json!({"sort": {"field": "ratio", "order": "asc"}}));
    assert_eq!(texts(&hits), vec!["low", "big"]);

    assert!(apply(&fx.rows, &schema, big, &json!({"ratio": {"$max": 1.5e308}})).unwrap());
    let row = fx.rows.select(&schema, big).unwrap().unwrap();
    assert_eq!(row["ratio"], json!(1.5e308));
}

#[test]
fn non_finite_float_operands_are_rejected() {
    let schema = quotes("alpha");
    for operator in ["$inc", "$mul", "$max"] {
        for operand in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let ops = json!({"ratio": {operator: operand}});
            assert!(parse_operations(&schema, &ops).is_err(), "{operator} {operand}");
        }
    }
}

// ============================================================================
// SECTION: Search
// ============================================================================

#[test]
fn like_filter_matches_pattern() {
    let fx = fixture();
    let schema = quotes("alpha");
    fx.registry.register(schema.clone()).unwrap();
    insert(&fx.rows, &schema, &json!({"text": "one", "author": "Alice Smith"}));
    insert(&fx.rows, &schema, &json!({"text": "two", "author": "Bob"}));
    insert(&fx.rows, &schema, &json!({"text": "three", "author": "Malice"}));
    insert(&fx.rows, &schema, &json!({"text": "four"}));

    let hits = search(&fx.rows, &schema, &json!({"filters": {"author": {"$like": "%Alice%"}}}));
    assert_eq!(texts(&hits), vec!["one", "three"]);
    let hits = search(&fx.rows, &schema, &json!({"filters": {"author": {"$like": "alice%"}}}));
    assert_eq!(texts(&hits), vec!["one"]);
    let hits = search(&fx.rows, &schema, &json!({"filters": {"author": {"$eq": "alice smith"}}}));
    assert!(hits.is_empty());
}

#[test]
fn or_in_sort_and_limit() {
    let fx = fixture();
    let schema = quotes("alpha");
    fx.registry.register(schema.clone()).unwrap();
    for (text, score) in [("a", 1), ("b", 5), ("c", 3), ("d", 9)] {
        insert(&fx.rows, &schema, &json!({"text": text, "score": score}));
    }

    let hits = search(
        &fx.rows,
        &schema,
        &json!({
            "filters": {"$or": [{"score": {"$in": [1, 3]}}, {"text": "d"}]},
            "sort": {"field": "score", "order": "desc"}
        }),
    );
    assert_eq!(texts(&hits), vec!["d", "c", "a"]);

    let hits = search(&fx.rows, &schema, &json!({"sort": {"field": "score"}, "limit": 2}));
    assert_eq!(texts(&hits), vec!["a", "c"]);

    let hits = search(&fx.rows, &schema, &json!({"filters": {"score": {"$in": []}}}));
    assert!(hits.is_empty());

    let hits = search(&fx.rows, &schema, &json!({"filters": {"score": {"$gt": 1, "$lt": 9}}}));
    assert_eq!(texts(&hits), vec!["b", "c"]);
}

#[test]
fn null_filters_use_is_null() {
    let fx = fixture();
    let schema = quotes("alpha");
    fx.registry.register(schema.clone()).unwrap();
    insert(&fx.rows, &schema, &json!({"text": "with", "author": "A"}));
    insert(&fx.rows, &schema, &json!({"text": "without"}));

    let hits = search(&fx.rows, &schema, &json!({"filters": {"author": null}}));
    assert_eq!(texts(&hits), vec!["without"]);
    let hits = search(&fx.rows, &schema, &json!({"filters": {"author": {"$ne": null}}}));
    assert_eq!(texts(&hits), vec!["with"]);
}

// ============================================================================
// SECTION: Store Metadata
// ============================================================================

#[test]
fn readiness_reports_ok() {
    let fx = fixture();
    fx.rows.readiness().unwrap();
}

#[test]
fn rejects_unknown_store_version() {
    let fx = fixture();
    let connection = Connection::open(&fx.config.path).unwrap();
    connection.execute("UPDATE store_meta SET version = 99", []).unwrap();
    drop(connection);
    let err = SqliteDatabase::open(&fx.config).unwrap_err();
    assert!(matches!(err, SqliteStoreError::VersionMismatch(_)));
}

#[test]
fn rejects_directory_path() {
    let dir = TempDir::new().unwrap();
    let err = SqliteDatabase::open(&SqliteStoreConfig::at(dir.path())).unwrap_err();
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}
