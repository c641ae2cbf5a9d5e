//! Read-side derivations over the entity store.
//!
//! Pure functions from a store reference to ordered views of a subtree. A
//! child ID whose record is missing is skipped rather than failed — partial
//! state is normal while a mutation is in flight — and repeated calls
//! against an unchanged store return equal results.

use serde_json::Value;

use crate::error::Result;
use crate::model::{Column, Input, Row, Section};
use crate::store::EntityStore;

/// Sections of an application, in display order.
pub fn sections_of<'a>(store: &'a EntityStore, application_id: &str) -> Result<Vec<&'a Section>> {
    let application = store.application(application_id)?;
    Ok(application
        .sections
        .iter()
        .filter_map(|id| store.find_section(id))
        .collect())
}

/// Rows of a section, in display order.
pub fn rows_of<'a>(store: &'a EntityStore, section_id: &str) -> Result<Vec<&'a Row>> {
    let section = store.section(section_id)?;
    Ok(section
        .rows
        .iter()
        .filter_map(|id| store.find_row(id))
        .collect())
}

/// Columns of a row, in display order.
pub fn columns_of<'a>(store: &'a EntityStore, row_id: &str) -> Result<Vec<&'a Column>> {
    let row = store.row(row_id)?;
    Ok(row
        .columns
        .iter()
        .filter_map(|id| store.find_column(id))
        .collect())
}

/// The input populating a column, when one exists and its record is present.
pub fn input_of<'a>(store: &'a EntityStore, column_id: &str) -> Result<Option<&'a Input>> {
    let column = store.column(column_id)?;
    Ok(column
        .input
        .as_deref()
        .and_then(|input_id| store.find_input(input_id)))
}

/// Reconstruct the full nested camelCase tree of an application, the exact
/// inverse of normalizing an application-rooted payload. Dangling child IDs
/// are omitted from their parent's array.
pub fn application_tree(store: &EntityStore, application_id: &str) -> Result<Value> {
    let application = store.application(application_id)?;
    let mut tree = serde_json::to_value(application)?;
    let sections = application
        .sections
        .iter()
        .filter_map(|id| store.find_section(id))
        .map(|section| section_subtree(store, section))
        .collect::<Result<Vec<_>>>()?;
    tree["sections"] = Value::Array(sections);
    Ok(tree)
}

fn section_subtree(store: &EntityStore, section: &Section) -> Result<Value> {
    let mut tree = serde_json::to_value(section)?;
    let rows = section
        .rows
        .iter()
        .filter_map(|id| store.find_row(id))
        .map(|row| row_subtree(store, row))
        .collect::<Result<Vec<_>>>()?;
    tree["rows"] = Value::Array(rows);
    Ok(tree)
}

fn row_subtree(store: &EntityStore, row: &Row) -> Result<Value> {
    let mut tree = serde_json::to_value(row)?;
    let columns = row
        .columns
        .iter()
        .filter_map(|id| store.find_column(id))
        .map(|column| column_subtree(store, column))
        .collect::<Result<Vec<_>>>()?;
    tree["columns"] = Value::Array(columns);
    Ok(tree)
}

fn column_subtree(store: &EntityStore, column: &Column) -> Result<Value> {
    let mut tree = serde_json::to_value(column)?;
    if let Some(input) = column.input.as_deref().and_then(|id| store.find_input(id)) {
        tree["input"] = serde_json::to_value(input)?;
    }
    Ok(tree)
}
