//! The session-scoped entity store: five ID-keyed tables plus the
//! parent→child indexes that make cascade deletes a bounded traversal.
//!
//! Records arrive either through [`EntityStore::merge`] (authoritative
//! subtree fetches; replace semantics, all-or-nothing) or through the typed
//! upserts plus an `attach_*` call (single-entity creation responses;
//! append-one semantics on the parent's ordered child list). Merges are
//! last-write-wins: every record reflects server-confirmed state, so a later
//! resolution simply overwrites an earlier one.
//!
//! The store is owned by one editing session, mutated only through the
//! session's coordinator, and cleared with [`EntityStore::reset`] when the
//! session ends.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{FormError, Result};
use crate::model::{Application, Column, EntityKind, Input, Row, Section};
use crate::normalize::NormalizedTables;

#[derive(Debug, Default)]
pub struct EntityStore {
    applications: HashMap<String, Application>,
    sections: HashMap<String, Section>,
    rows: HashMap<String, Row>,
    columns: HashMap<String, Column>,
    inputs: HashMap<String, Input>,

    // One index per containment relationship, maintained on every insert and
    // delete so a cascade never scans a whole table.
    sections_by_application: HashMap<String, Vec<String>>,
    rows_by_section: HashMap<String, Vec<String>>,
    columns_by_row: HashMap<String, Vec<String>>,
    input_by_column: HashMap<String, String>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all tables and indexes. Session teardown.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
            && self.sections.is_empty()
            && self.rows.is_empty()
            && self.columns.is_empty()
            && self.inputs.is_empty()
    }

    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        match kind {
            EntityKind::Application => self.applications.contains_key(id),
            EntityKind::Section => self.sections.contains_key(id),
            EntityKind::Row => self.rows.contains_key(id),
            EntityKind::Column => self.columns.contains_key(id),
            EntityKind::Input => self.inputs.contains_key(id),
        }
    }

    // ── read accessors ───────────────────────────────────────────

    pub fn application(&self, id: &str) -> Result<&Application> {
        self.find_application(id)
            .ok_or_else(|| FormError::not_found(EntityKind::Application, id))
    }

    pub fn section(&self, id: &str) -> Result<&Section> {
        self.find_section(id)
            .ok_or_else(|| FormError::not_found(EntityKind::Section, id))
    }

    pub fn row(&self, id: &str) -> Result<&Row> {
        self.find_row(id)
            .ok_or_else(|| FormError::not_found(EntityKind::Row, id))
    }

    pub fn column(&self, id: &str) -> Result<&Column> {
        self.find_column(id)
            .ok_or_else(|| FormError::not_found(EntityKind::Column, id))
    }

    pub fn input(&self, id: &str) -> Result<&Input> {
        self.find_input(id)
            .ok_or_else(|| FormError::not_found(EntityKind::Input, id))
    }

    pub fn find_application(&self, id: &str) -> Option<&Application> {
        self.applications.get(id)
    }

    pub fn find_section(&self, id: &str) -> Option<&Section> {
        self.sections.get(id)
    }

    pub fn find_row(&self, id: &str) -> Option<&Row> {
        self.rows.get(id)
    }

    pub fn find_column(&self, id: &str) -> Option<&Column> {
        self.columns.get(id)
    }

    pub fn find_input(&self, id: &str) -> Option<&Input> {
        self.inputs.get(id)
    }

    pub fn application_by_slug(&self, slug: &str) -> Option<&Application> {
        self.applications
            .values()
            .find(|app| app.slug.as_deref() == Some(slug))
    }

    pub fn applications(&self) -> impl Iterator<Item = &Application> {
        self.applications.values()
    }

    // ── merge ────────────────────────────────────────────────────

    /// Merge a full normalized extraction. All records are validated into
    /// their typed shapes before anything is committed, so a malformed
    /// record leaves the store untouched.
    pub fn merge(&mut self, tables: &NormalizedTables) -> Result<()> {
        let applications = decode::<Application>(tables, EntityKind::Application)?;
        let sections = decode::<Section>(tables, EntityKind::Section)?;
        let rows = decode::<Row>(tables, EntityKind::Row)?;
        let columns = decode::<Column>(tables, EntityKind::Column)?;
        let inputs = decode::<Input>(tables, EntityKind::Input)?;

        debug!(
            applications = applications.len(),
            sections = sections.len(),
            rows = rows.len(),
            columns = columns.len(),
            inputs = inputs.len(),
            "merging normalized tables"
        );

        // Parents first, so the column back-reference fix-up sees its row.
        for application in applications {
            self.upsert_application(application);
        }
        for section in sections {
            self.upsert_section(section);
        }
        for row in rows {
            self.upsert_row(row);
        }
        for column in columns {
            self.upsert_column(column);
        }
        for input in inputs {
            self.upsert_input(input);
        }
        Ok(())
    }

    // ── typed upserts (replace semantics, last-write-wins) ───────

    pub fn upsert_application(&mut self, application: Application) {
        self.applications
            .insert(application.id.clone(), application);
    }

    pub fn upsert_section(&mut self, section: Section) {
        if let Some(previous) = self.sections.get(&section.id) {
            if previous.application_id != section.application_id {
                index_remove(
                    &mut self.sections_by_application,
                    &previous.application_id,
                    &section.id,
                );
            }
        }
        index_add(
            &mut self.sections_by_application,
            &section.application_id,
            &section.id,
        );
        self.sections.insert(section.id.clone(), section);
    }

    pub fn upsert_row(&mut self, row: Row) {
        if let Some(previous) = self.rows.get(&row.id) {
            if previous.section_id != row.section_id {
                index_remove(&mut self.rows_by_section, &previous.section_id, &row.id);
            }
        }
        index_add(&mut self.rows_by_section, &row.section_id, &row.id);
        self.rows.insert(row.id.clone(), row);
    }

    /// Insert a column, rewriting its `sectionId` from the owning row. The
    /// back-reference is derived state; the row is authoritative.
    pub fn upsert_column(&mut self, mut column: Column) {
        if let Some(row) = self.rows.get(&column.row_id) {
            column.section_id = row.section_id.clone();
        }
        if let Some(previous) = self.columns.get(&column.id) {
            if previous.row_id != column.row_id {
                index_remove(&mut self.columns_by_row, &previous.row_id, &column.id);
            }
            // Replace semantics extend to the input slot: an input the
            // incoming record no longer references is gone, not orphaned.
            if previous.input != column.input {
                if let Some(old_input_id) = previous.input.clone() {
                    self.input_by_column.remove(&column.id);
                    self.inputs.remove(&old_input_id);
                }
            }
        }
        index_add(&mut self.columns_by_row, &column.row_id, &column.id);
        if let Some(input_id) = &column.input {
            self.input_by_column
                .insert(column.id.clone(), input_id.clone());
        }
        self.columns.insert(column.id.clone(), column);
    }

    pub fn upsert_input(&mut self, input: Input) {
        if let Some(column_id) = &input.column_id {
            self.input_by_column
                .insert(column_id.clone(), input.id.clone());
        }
        self.inputs.insert(input.id.clone(), input);
    }

    // ── append-one child attachment (creation responses) ─────────

    /// Append a section ID to its application's ordered list.
    pub fn attach_section(&mut self, application_id: &str, section_id: &str) -> Result<()> {
        let application = self
            .applications
            .get_mut(application_id)
            .ok_or_else(|| FormError::not_found(EntityKind::Application, application_id))?;
        push_unique(&mut application.sections, section_id);
        Ok(())
    }

    /// Append a row ID to its section's ordered list.
    pub fn attach_row(&mut self, section_id: &str, row_id: &str) -> Result<()> {
        let section = self
            .sections
            .get_mut(section_id)
            .ok_or_else(|| FormError::not_found(EntityKind::Section, section_id))?;
        push_unique(&mut section.rows, row_id);
        Ok(())
    }

    /// Append a column ID to its row's ordered list.
    pub fn attach_column(&mut self, row_id: &str, column_id: &str) -> Result<()> {
        let row = self
            .rows
            .get_mut(row_id)
            .ok_or_else(|| FormError::not_found(EntityKind::Row, row_id))?;
        push_unique(&mut row.columns, column_id);
        Ok(())
    }

    /// Point a column at its newly created input.
    pub fn attach_input(&mut self, column_id: &str, input_id: &str) -> Result<()> {
        let column = self
            .columns
            .get_mut(column_id)
            .ok_or_else(|| FormError::not_found(EntityKind::Column, column_id))?;
        column.input = Some(input_id.to_string());
        self.input_by_column
            .insert(column_id.to_string(), input_id.to_string());
        if let Some(input) = self.inputs.get_mut(input_id) {
            input.column_id = Some(column_id.to_string());
        }
        Ok(())
    }

    /// Flip the publication flag on the application addressed by `slug`.
    pub fn mark_published(&mut self, slug: &str) -> Result<&Application> {
        let application = self
            .applications
            .values_mut()
            .find(|app| app.slug.as_deref() == Some(slug))
            .ok_or_else(|| FormError::not_found(EntityKind::Application, slug))?;
        application.published = true;
        Ok(application)
    }

    // ── cascade delete ───────────────────────────────────────────

    /// Remove an entity and every descendant whose back-reference chain
    /// terminates at it, detaching it from its parent's ordered list.
    /// Deleting an ID the store no longer holds is a no-op: two racing
    /// deletes both resolve cleanly.
    pub fn cascade_delete(&mut self, kind: EntityKind, id: &str) {
        debug!(%kind, id, "cascade delete");
        match kind {
            EntityKind::Application => self.delete_application(id),
            EntityKind::Section => self.delete_section(id, true),
            EntityKind::Row => self.delete_row(id, true),
            EntityKind::Column => self.delete_column(id, true),
            EntityKind::Input => self.delete_input(id, true),
        }
    }

    fn delete_application(&mut self, id: &str) {
        self.applications.remove(id);
        for section_id in self.sections_by_application.remove(id).unwrap_or_default() {
            self.delete_section(&section_id, false);
        }
    }

    fn delete_section(&mut self, id: &str, detach_parent: bool) {
        if let Some(section) = self.sections.remove(id) {
            if detach_parent {
                index_remove(
                    &mut self.sections_by_application,
                    &section.application_id,
                    id,
                );
                if let Some(application) = self.applications.get_mut(&section.application_id) {
                    application.sections.retain(|s| s != id);
                }
            }
        }
        for row_id in self.rows_by_section.remove(id).unwrap_or_default() {
            self.delete_row(&row_id, false);
        }
    }

    fn delete_row(&mut self, id: &str, detach_parent: bool) {
        if let Some(row) = self.rows.remove(id) {
            if detach_parent {
                index_remove(&mut self.rows_by_section, &row.section_id, id);
                if let Some(section) = self.sections.get_mut(&row.section_id) {
                    section.rows.retain(|r| r != id);
                }
            }
        }
        for column_id in self.columns_by_row.remove(id).unwrap_or_default() {
            self.delete_column(&column_id, false);
        }
    }

    fn delete_column(&mut self, id: &str, detach_parent: bool) {
        if let Some(column) = self.columns.remove(id) {
            if detach_parent {
                index_remove(&mut self.columns_by_row, &column.row_id, id);
                if let Some(row) = self.rows.get_mut(&column.row_id) {
                    row.columns.retain(|c| c != id);
                }
            }
        }
        if let Some(input_id) = self.input_by_column.remove(id) {
            self.inputs.remove(&input_id);
        }
    }

    fn delete_input(&mut self, id: &str, detach_parent: bool) {
        let owning_column = self
            .inputs
            .remove(id)
            .and_then(|input| input.column_id)
            .or_else(|| {
                self.input_by_column
                    .iter()
                    .find(|(_, input_id)| input_id.as_str() == id)
                    .map(|(column_id, _)| column_id.clone())
            });
        if let Some(column_id) = owning_column {
            self.input_by_column.remove(&column_id);
            if detach_parent {
                if let Some(column) = self.columns.get_mut(&column_id) {
                    column.input = None;
                }
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    tables: &NormalizedTables,
    kind: EntityKind,
) -> Result<Vec<T>> {
    let Some(table) = tables.table(kind) else {
        return Ok(Vec::new());
    };
    let mut records = Vec::with_capacity(table.len());
    for (id, value) in table {
        let record = serde_json::from_value(value.clone())
            .map_err(|e| FormError::integrity(format!("malformed {kind} {id}: {e}")))?;
        records.push(record);
    }
    Ok(records)
}

fn index_add(index: &mut HashMap<String, Vec<String>>, parent: &str, child: &str) {
    push_unique(index.entry(parent.to_string()).or_default(), child);
}

fn index_remove(index: &mut HashMap<String, Vec<String>>, parent: &str, child: &str) {
    if let Some(children) = index.get_mut(parent) {
        children.retain(|c| c != child);
        if children.is_empty() {
            index.remove(parent);
        }
    }
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}
