//! Declarative entity-relationship schemas driving normalization.
//!
//! Each schema names, per entity kind, which payload fields hold nested
//! entities. One static per entry point; the engine in [`crate::normalize`]
//! is a single generic walk over these descriptions rather than ad hoc
//! recursion per payload shape.

use crate::model::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// The field holds a single nested entity.
    One,
    /// The field holds an ordered collection of nested entities.
    Many,
}

/// A payload field whose value is itself an entity (or collection of them).
#[derive(Debug)]
pub struct NestedField {
    pub field: &'static str,
    pub schema: &'static EntitySchema,
    pub cardinality: Cardinality,
    /// Key under which the child record carries its parent's ID. Nested
    /// payloads may omit it on the wire; the walk writes it from traversal
    /// context so the containing entity always wins. `None` for siblings
    /// that are not children of the containing entity.
    pub back_reference: Option<&'static str>,
}

/// Normalization description for one entity kind.
#[derive(Debug)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub nested: &'static [NestedField],
}

pub static INPUT_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Input,
    nested: &[],
};

pub static COLUMN_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Column,
    nested: &[NestedField {
        field: "input",
        schema: &INPUT_SCHEMA,
        cardinality: Cardinality::One,
        back_reference: Some("columnId"),
    }],
};

pub static ROW_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Row,
    nested: &[NestedField {
        field: "columns",
        schema: &COLUMN_SCHEMA,
        cardinality: Cardinality::Many,
        back_reference: Some("rowId"),
    }],
};

pub static SECTION_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Section,
    nested: &[NestedField {
        field: "rows",
        schema: &ROW_SCHEMA,
        cardinality: Cardinality::Many,
        back_reference: Some("sectionId"),
    }],
};

/// Application-rooted tree: Application → Sections → Rows → Columns → Input.
pub static APPLICATION_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Application,
    nested: &[NestedField {
        field: "sections",
        schema: &SECTION_SCHEMA,
        cardinality: Cardinality::Many,
        back_reference: Some("applicationId"),
    }],
};

/// Bare application reference, no recursion into sections. Used where a
/// payload carries the parent application as a sibling entity.
static APPLICATION_REF_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Application,
    nested: &[],
};

/// Section-rooted tree: Section → Rows → Columns → Input, plus the single
/// parent Application nested alongside.
pub static SECTION_TREE_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Section,
    nested: &[
        NestedField {
            field: "rows",
            schema: &ROW_SCHEMA,
            cardinality: Cardinality::Many,
            back_reference: Some("sectionId"),
        },
        NestedField {
            field: "application",
            schema: &APPLICATION_REF_SCHEMA,
            cardinality: Cardinality::One,
            back_reference: None,
        },
    ],
};
