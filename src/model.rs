//! Record shapes for the five-entity form hierarchy.
//!
//! Application → Section → Row → Column → (optional) Input, each addressed by
//! an opaque string ID assigned by the remote service. Child IDs are kept in
//! ordered lists on the parent record; order is display order and survives
//! normalize/denormalize round trips. All records serialize camelCase, the
//! crate-internal convention.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tag for one of the five entity tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Application,
    Section,
    Row,
    Column,
    Input,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Application => "application",
            EntityKind::Section => "section",
            EntityKind::Row => "row",
            EntityKind::Column => "column",
            EntityKind::Input => "input",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// URL slug; fetch and publish address an application by slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub published: bool,
    /// Ordered section IDs.
    #[serde(default)]
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    /// Section-rooted fetches nest the parent as `application`, which
    /// normalization collapses to its ID; application-rooted payloads carry
    /// `applicationId` directly.
    #[serde(alias = "application")]
    pub application_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Column count applied to rows created under this section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_of_cols: Option<u32>,
    /// Ordered row IDs.
    #[serde(default)]
    pub rows: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: String,
    pub section_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_of_cols: Option<u32>,
    /// Ordered column IDs.
    #[serde(default)]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub row_id: String,
    /// Denormalized back-reference to the owning section. Creation responses
    /// may omit it; the store rewrites it from the owning row on every
    /// insert, so a stored column always agrees with its row.
    #[serde(default)]
    pub section_id: String,
    /// ID of the input populating this column, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    #[serde(rename = "type")]
    pub input_type: String,
    pub label: String,
}

// ── mutation intents ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationAttributes {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationAttributes {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSectionAttributes {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub num_of_cols: u32,
    pub application_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSectionAttributes {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_of_cols: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRowAttributes {
    pub num_of_cols: u32,
    pub section_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRowAttributes {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_of_cols: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateColumnAttributes {
    pub row_id: String,
    pub section_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInputAttributes {
    pub column_id: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub label: String,
}

/// A filled form on the applicant side. Submissions are not session
/// entities; the payload goes to the service and nothing is stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmissionAttributes {
    pub application_id: String,
    /// Applicant answers keyed by input ID.
    pub values: HashMap<String, Value>,
}

// ── operation results ────────────────────────────────────────────

/// Result of deleting a column. The row ID lets the consumer refresh
/// row-level state without another fetch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteColumnOutcome {
    pub column_id: String,
    pub row_id: String,
}

/// A created row together with the columns the service created under it.
#[derive(Debug, Clone, PartialEq)]
pub struct RowTree {
    pub row: Row,
    pub columns: Vec<Column>,
}
