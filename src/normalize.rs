//! Normalization engine: nested tree payload → flat per-kind entity tables.
//!
//! Given an internal-convention payload and an [`EntitySchema`], every entity
//! occurrence is extracted into an ID-keyed table and each nested occurrence
//! is replaced by its ID (or ordered ID list for collections). A payload
//! entity without an `id` fails the whole walk with
//! [`FormError::Integrity`], so a caller never merges a partial extraction.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{FormError, Result};
use crate::model::EntityKind;
use crate::schema::{Cardinality, EntitySchema};

/// Flat extraction result: one ID-keyed table per entity kind present in the
/// payload, plus the root entity's identity.
#[derive(Debug)]
pub struct NormalizedTables {
    tables: HashMap<EntityKind, HashMap<String, Value>>,
    root_kind: EntityKind,
    root_id: String,
}

impl NormalizedTables {
    pub fn root_kind(&self) -> EntityKind {
        self.root_kind
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// Table for one kind; `None` when the payload held no such entities.
    pub fn table(&self, kind: EntityKind) -> Option<&HashMap<String, Value>> {
        self.tables.get(&kind)
    }

    /// All extracted records of one kind; empty when the kind is absent.
    pub fn records(&self, kind: EntityKind) -> Vec<&Value> {
        self.tables
            .get(&kind)
            .map(|table| table.values().collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &HashMap<String, Value>)> {
        self.tables.iter().map(|(kind, table)| (*kind, table))
    }
}

/// Flatten `payload` according to `schema`.
pub fn normalize(payload: Value, schema: &'static EntitySchema) -> Result<NormalizedTables> {
    let mut tables = HashMap::new();
    let root_id = visit(payload, schema, None, &mut tables)?;
    Ok(NormalizedTables {
        tables,
        root_kind: schema.kind,
        root_id,
    })
}

fn visit(
    value: Value,
    schema: &EntitySchema,
    parent: Option<(&str, &str)>,
    tables: &mut HashMap<EntityKind, HashMap<String, Value>>,
) -> Result<String> {
    let Value::Object(mut record) = value else {
        return Err(FormError::integrity(format!(
            "expected {} entity to be an object, got {value}",
            schema.kind
        )));
    };

    let id = entity_id(schema.kind, record.get("id"))?;
    record.insert("id".to_string(), Value::String(id.clone()));

    // Nested payloads may omit the parent reference; the containing entity
    // is authoritative for it either way.
    if let Some((key, parent_id)) = parent {
        record.insert(key.to_string(), Value::String(parent_id.to_string()));
    }

    for nested in schema.nested {
        let Some(child) = record.remove(nested.field) else {
            continue;
        };
        let context = nested.back_reference.map(|key| (key, id.as_str()));
        match (nested.cardinality, child) {
            (_, Value::Null) => {}
            (Cardinality::One, child) => {
                let child_id = visit(child, nested.schema, context, tables)?;
                record.insert(nested.field.to_string(), Value::String(child_id));
            }
            (Cardinality::Many, Value::Array(children)) => {
                let mut ids = Vec::with_capacity(children.len());
                for child in children {
                    ids.push(Value::String(visit(child, nested.schema, context, tables)?));
                }
                record.insert(nested.field.to_string(), Value::Array(ids));
            }
            (Cardinality::Many, other) => {
                return Err(FormError::integrity(format!(
                    "expected {}.{} to be an array, got {other}",
                    schema.kind, nested.field
                )));
            }
        }
    }

    tables
        .entry(schema.kind)
        .or_default()
        .insert(id.clone(), Value::Object(record));
    Ok(id)
}

/// IDs are opaque strings; a numeric wire ID is canonicalized to its decimal
/// string form so the store never does arithmetic on identity.
fn entity_id(kind: EntityKind, raw: Option<&Value>) -> Result<String> {
    match raw {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(FormError::integrity(format!("{kind} entity is missing an id"))),
    }
}
