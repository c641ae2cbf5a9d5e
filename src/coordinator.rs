//! Mutation coordinator: one entry point per remote operation.
//!
//! Every operation follows the same four stages: transcode the outgoing
//! intent to the external convention, issue the request through the
//! [`Transport`] seam, map a non-success status to an [`FormError::Operation`]
//! with the operation's user-facing message, then transcode the response
//! back and fold it into the session's [`EntityStore`] — a normalized merge
//! for fetches, a single-record upsert plus parent attachment for creates,
//! a cascade for deletes. No operation ever retries; every failure is a
//! typed result for the caller, and a failed mutation leaves the store as
//! it was.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::casing;
use crate::error::{FormError, Result};
use crate::model::{
    Application, Column, CreateApplicationAttributes, CreateColumnAttributes,
    CreateInputAttributes, CreateRowAttributes, CreateSectionAttributes, CreateSubmissionAttributes,
    DeleteColumnOutcome,
    EntityKind, Input, Row, RowTree, Section, UpdateApplicationAttributes, UpdateRowAttributes,
    UpdateSectionAttributes,
};
use crate::schema::{APPLICATION_SCHEMA, ROW_SCHEMA, SECTION_TREE_SCHEMA};
use crate::select;
use crate::store::EntityStore;
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

/// Owns one editing session's store and serializes all mutations against it.
pub struct SessionCoordinator<T: Transport> {
    transport: T,
    store: EntityStore,
}

impl<T: Transport> SessionCoordinator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            store: EntityStore::new(),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Tear down the session's state.
    pub fn end_session(&mut self) {
        self.store.reset();
    }

    async fn request(
        &self,
        method: Method,
        path: String,
        body: Option<Value>,
    ) -> Result<ApiResponse> {
        let request = ApiRequest {
            method,
            path,
            body: body.map(casing::to_external),
            params: None,
        };
        let mut response = self.transport.execute(request).await?;
        if response.is_json() {
            response.body = casing::to_internal(std::mem::take(&mut response.body));
        }
        Ok(response)
    }

    // ── applications ─────────────────────────────────────────────

    pub async fn list_applications(&mut self) -> Result<Vec<Application>> {
        let response = self
            .request(Method::Get, "applications".to_string(), None)
            .await?;
        ensure_success(&response, "Failed to load applications.")?;
        let applications: Vec<Application> = serde_json::from_value(response.body)?;
        for application in &applications {
            let mut record = application.clone();
            // Listing entries carry no children; keep the section list of
            // any tree this session already loaded.
            if record.sections.is_empty() {
                if let Some(existing) = self.store.find_application(&record.id) {
                    record.sections = existing.sections.clone();
                }
            }
            self.store.upsert_application(record);
        }
        Ok(applications)
    }

    /// Fetch the full application tree and merge it, all or nothing.
    pub async fn fetch_application(&mut self, slug: &str) -> Result<Application> {
        let response = self
            .request(Method::Get, format!("applications/{slug}"), None)
            .await?;
        ensure_success(&response, "Failed to load application.")?;
        let tables = crate::normalize::normalize(response.body, &APPLICATION_SCHEMA)?;
        self.store.merge(&tables)?;
        info!(slug, root = tables.root_id(), "application tree merged");
        Ok(self.store.application(tables.root_id())?.clone())
    }

    pub async fn create_application(
        &mut self,
        attributes: CreateApplicationAttributes,
    ) -> Result<Application> {
        let response = self
            .request(
                Method::Post,
                "applications".to_string(),
                Some(serde_json::to_value(&attributes)?),
            )
            .await?;
        ensure_success(&response, "Failed to create application.")?;
        let application: Application = serde_json::from_value(response.body)?;
        self.store.upsert_application(application.clone());
        Ok(application)
    }

    pub async fn update_application(
        &mut self,
        attributes: UpdateApplicationAttributes,
    ) -> Result<Application> {
        let path = format!("applications/{}", attributes.id);
        let response = self
            .request(Method::Put, path, Some(serde_json::to_value(&attributes)?))
            .await?;
        ensure_success(&response, "Failed to update application.")?;
        let mut application: Application = serde_json::from_value(response.body)?;
        // An update response carries fields, not children; keep the list we
        // already hold rather than wiping it.
        if application.sections.is_empty() {
            if let Some(existing) = self.store.find_application(&application.id) {
                application.sections = existing.sections.clone();
            }
        }
        self.store.upsert_application(application.clone());
        Ok(application)
    }

    pub async fn delete_application(&mut self, application_id: &str) -> Result<()> {
        let path = format!("applications/{application_id}");
        let response = self.request(Method::Delete, path, None).await?;
        ensure_success(&response, "Failed to delete application.")?;
        self.store
            .cascade_delete(EntityKind::Application, application_id);
        Ok(())
    }

    /// State transition, not a structural mutation: a body-less PATCH that
    /// flips the publication flag.
    pub async fn publish_application(&mut self, slug: &str) -> Result<String> {
        let path = format!("applications/{slug}/publish");
        let response = self.request(Method::Patch, path, None).await?;
        ensure_success(&response, "Failed to publish application.")?;
        // The flag only matters for an application this session has loaded.
        if self.store.application_by_slug(slug).is_some() {
            self.store.mark_published(slug)?;
        }
        Ok(slug.to_string())
    }

    // ── sections ─────────────────────────────────────────────────

    pub async fn create_section(
        &mut self,
        attributes: CreateSectionAttributes,
    ) -> Result<Section> {
        let response = self
            .request(
                Method::Post,
                "sections".to_string(),
                Some(serde_json::to_value(&attributes)?),
            )
            .await?;
        ensure_success(&response, "Failed to create section.")?;
        let section: Section = serde_json::from_value(response.body)?;
        self.store.upsert_section(section.clone());
        // The parent may not be loaded in this session; the create still
        // succeeded server-side, so only attach when it is.
        if self.store.find_application(&section.application_id).is_some() {
            self.store
                .attach_section(&section.application_id, &section.id)?;
        }
        Ok(section)
    }

    pub async fn update_section(
        &mut self,
        attributes: UpdateSectionAttributes,
    ) -> Result<Section> {
        let path = format!("sections/{}", attributes.id);
        let response = self
            .request(Method::Put, path, Some(serde_json::to_value(&attributes)?))
            .await?;
        ensure_success(&response, "Failed to update section.")?;
        let mut section: Section = serde_json::from_value(response.body)?;
        if section.rows.is_empty() {
            if let Some(existing) = self.store.find_section(&section.id) {
                section.rows = existing.rows.clone();
            }
        }
        self.store.upsert_section(section.clone());
        Ok(section)
    }

    /// Fetch a section subtree plus its sibling application record.
    pub async fn fetch_section(&mut self, section_id: &str) -> Result<Section> {
        let response = self
            .request(Method::Get, format!("sections/{section_id}"), None)
            .await?;
        ensure_success(&response, "Failed to load section.")?;
        let tables = crate::normalize::normalize(response.body, &SECTION_TREE_SCHEMA)?;
        self.store.merge(&tables)?;
        Ok(self.store.section(tables.root_id())?.clone())
    }

    pub async fn delete_section(&mut self, section_id: &str) -> Result<()> {
        let path = format!("sections/{section_id}");
        let response = self.request(Method::Delete, path, None).await?;
        ensure_success(&response, "Failed to delete section.")?;
        self.store.cascade_delete(EntityKind::Section, section_id);
        Ok(())
    }

    // ── rows ─────────────────────────────────────────────────────

    /// Create a row; the service answers with the row and any columns it
    /// created under it.
    pub async fn create_row(&mut self, attributes: CreateRowAttributes) -> Result<RowTree> {
        let response = self
            .request(
                Method::Post,
                "rows".to_string(),
                Some(serde_json::to_value(&attributes)?),
            )
            .await?;
        ensure_success(&response, "Failed to create row.")?;
        let tables = crate::normalize::normalize(response.body, &ROW_SCHEMA)?;
        self.store.merge(&tables)?;
        let row = self.store.row(tables.root_id())?.clone();
        if self.store.find_section(&row.section_id).is_some() {
            self.store.attach_row(&row.section_id, &row.id)?;
        }
        let columns = select::columns_of(&self.store, &row.id)?
            .into_iter()
            .cloned()
            .collect();
        Ok(RowTree { row, columns })
    }

    pub async fn update_row(&mut self, attributes: UpdateRowAttributes) -> Result<Row> {
        let path = format!("rows/{}", attributes.id);
        let response = self
            .request(Method::Put, path, Some(serde_json::to_value(&attributes)?))
            .await?;
        ensure_success(&response, "Failed to update row.")?;
        let mut row: Row = serde_json::from_value(response.body)?;
        if row.columns.is_empty() {
            if let Some(existing) = self.store.find_row(&row.id) {
                row.columns = existing.columns.clone();
            }
        }
        self.store.upsert_row(row.clone());
        Ok(row)
    }

    pub async fn delete_row(&mut self, row_id: &str) -> Result<()> {
        let response = self
            .request(Method::Delete, format!("rows/{row_id}"), None)
            .await?;
        ensure_success(&response, "Failed to delete row.")?;
        self.store.cascade_delete(EntityKind::Row, row_id);
        Ok(())
    }

    // ── columns ──────────────────────────────────────────────────

    pub async fn create_column(&mut self, attributes: CreateColumnAttributes) -> Result<Column> {
        let response = self
            .request(
                Method::Post,
                "columns".to_string(),
                Some(serde_json::to_value(&attributes)?),
            )
            .await?;
        ensure_success(&response, "Failed to add column to row")?;
        let column: Column = serde_json::from_value(response.body)?;
        let column_id = column.id.clone();
        // The upsert rewrites sectionId from the owning row, so hand back the
        // stored record rather than the raw response.
        self.store.upsert_column(column);
        if self.store.find_row(&attributes.row_id).is_some() {
            self.store.attach_column(&attributes.row_id, &column_id)?;
        }
        Ok(self.store.column(&column_id)?.clone())
    }

    /// Delete a column, reporting both its ID and the owning row's so the
    /// caller can refresh row-level state without another fetch.
    pub async fn delete_column(&mut self, column_id: &str) -> Result<DeleteColumnOutcome> {
        let stored_row_id = self
            .store
            .find_column(column_id)
            .map(|column| column.row_id.clone());
        let response = self
            .request(Method::Delete, format!("columns/{column_id}"), None)
            .await?;
        ensure_success(&response, "Failed to delete column.")?;
        let outcome = serde_json::from_value::<DeleteColumnOutcome>(response.body)
            .ok()
            .or_else(|| {
                stored_row_id.map(|row_id| DeleteColumnOutcome {
                    column_id: column_id.to_string(),
                    row_id,
                })
            })
            .ok_or_else(|| {
                FormError::integrity(format!(
                    "delete of column {column_id} reported no owning row"
                ))
            })?;
        self.store.cascade_delete(EntityKind::Column, column_id);
        Ok(outcome)
    }

    // ── inputs ───────────────────────────────────────────────────

    pub async fn create_input(&mut self, attributes: CreateInputAttributes) -> Result<Input> {
        let response = self
            .request(
                Method::Post,
                "inputs".to_string(),
                Some(serde_json::to_value(&attributes)?),
            )
            .await?;
        ensure_success(&response, "Failed to add input")?;
        let mut input: Input = serde_json::from_value(response.body)?;
        if input.column_id.is_none() {
            input.column_id = Some(attributes.column_id.clone());
        }
        self.store.upsert_input(input.clone());
        if self.store.find_column(&attributes.column_id).is_some() {
            self.store.attach_input(&attributes.column_id, &input.id)?;
        }
        Ok(input)
    }

    pub async fn delete_input(&mut self, input_id: &str) -> Result<String> {
        let response = self
            .request(Method::Delete, format!("inputs/{input_id}"), None)
            .await?;
        ensure_success(&response, "Failed to delete input")?;
        self.store.cascade_delete(EntityKind::Input, input_id);
        Ok(input_id.to_string())
    }

    // ── submissions ──────────────────────────────────────────────

    /// Send an applicant's filled form. Submissions are write-only from this
    /// side; nothing lands in the session store.
    pub async fn submit_application(
        &mut self,
        attributes: CreateSubmissionAttributes,
    ) -> Result<()> {
        let response = self
            .request(
                Method::Post,
                "submissions".to_string(),
                Some(serde_json::to_value(&attributes)?),
            )
            .await?;
        ensure_success(&response, "Failed to submit application.")?;
        info!(application = %attributes.application_id, "submission accepted");
        Ok(())
    }
}

fn ensure_success(response: &ApiResponse, failure_message: &str) -> Result<()> {
    if response.is_success() {
        debug!(status = response.status, "operation succeeded");
        Ok(())
    } else {
        warn!(status = response.status, "{failure_message}");
        Err(FormError::operation(failure_message, Some(response.status)))
    }
}
