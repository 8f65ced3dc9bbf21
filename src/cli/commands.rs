//! CLI command implementations
//!
//! Each command opens the store, performs one operation, logs a structured
//! completion event and prints results (documents as JSON lines) to
//! stdout.

use std::path::Path;

use crate::document::json;
use crate::observability::Logger;
use crate::query::Selection;
use crate::store::Store;

use super::args::{Command, QueryOp};
use super::errors::CliResult;

/// Dispatches a parsed command.
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Insert { db, json } => insert(&db, &json),
        Command::List { db } => list(&db),
        Command::Count { db } => count(&db),
        Command::Query {
            db,
            field,
            op,
            value,
            one,
        } => query(&db, &field, op, &value, one),
        Command::Remove {
            db,
            field,
            op,
            value,
        } => remove(&db, &field, op, &value),
        Command::Compact { db, dest } => compact(&db, &dest),
    }
}

fn insert(db: &Path, text: &str) -> CliResult<()> {
    let parsed: serde_json::Value = serde_json::from_str(text)?;
    let doc = json::document_from_json(&parsed)?;

    let store = Store::open(db)?;
    store.root().insert(&doc)?;
    store.close()?;

    Logger::info(
        "DOCUMENT_INSERTED",
        &[("db", &db.display().to_string())],
    );
    Ok(())
}

fn list(db: &Path) -> CliResult<()> {
    let store = Store::open(db)?;
    let documents = store.root().as_collection()?;

    for document in &documents {
        println!("{}", json::to_json(document));
    }
    Ok(())
}

fn count(db: &Path) -> CliResult<()> {
    let store = Store::open(db)?;
    println!("{}", store.root().count()?);
    Ok(())
}

fn query(db: &Path, field: &str, op: QueryOp, value: &str, one: bool) -> CliResult<()> {
    let store = Store::open(db)?;
    let root = store.root();

    let selection = if one { root.find_one() } else { root.find_all() };
    let matched = apply_op(selection, field, op, value).commit()?;

    let documents = matched.as_collection()?;
    for document in &documents {
        println!("{}", json::to_json(document));
    }

    Logger::info(
        "QUERY_COMPLETE",
        &[
            ("db", &db.display().to_string()),
            ("matches", &matched.count()?.to_string()),
            (
                "records_seen",
                &matched.records_seen().unwrap_or(0).to_string(),
            ),
        ],
    );
    Ok(())
}

fn remove(db: &Path, field: &str, op: QueryOp, value: &str) -> CliResult<()> {
    let store = Store::open(db)?;
    let root = store.root();

    let matched = apply_op(root.find_all(), field, op, value).commit()?;
    let removed = matched.remove()?;
    store.close()?;

    Logger::info(
        "REMOVE_COMPLETE",
        &[
            ("db", &db.display().to_string()),
            ("removed", &removed.to_string()),
        ],
    );
    Ok(())
}

fn compact(db: &Path, dest: &Path) -> CliResult<()> {
    let store = Store::open(db)?;
    store.root().export(dest)?;

    Logger::info(
        "COMPACT_COMPLETE",
        &[
            ("db", &db.display().to_string()),
            ("dest", &dest.display().to_string()),
        ],
    );
    Ok(())
}

fn apply_op<'s>(selection: Selection<'s>, field: &str, op: QueryOp, value: &str) -> Selection<'s> {
    match op {
        QueryOp::Eq => selection.eq(field, value),
        QueryOp::Ne => selection.ne(field, value),
        QueryOp::Gt => selection.gt(field, value),
        QueryOp::Ge => selection.ge(field, value),
        QueryOp::Lt => selection.lt(field, value),
        QueryOp::Le => selection.le(field, value),
    }
}
