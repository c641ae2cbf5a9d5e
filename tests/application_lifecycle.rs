//! End-to-end coordinator flow against a stubbed wire: fetch, create,
//! delete, publish, and the failure paths, asserting the store after each
//! resolution.

mod helpers;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use helpers::{init_tracing, StubTransport};
use quikapply_core::coordinator::SessionCoordinator;
use quikapply_core::error::FormError;
use quikapply_core::model::{
    CreateColumnAttributes, CreateInputAttributes, CreateRowAttributes, CreateSectionAttributes,
    CreateSubmissionAttributes, EntityKind, UpdateSectionAttributes,
};
use quikapply_core::select;
use quikapply_core::transport::Method;

/// Wire-convention application tree: app-1 → sec-1 → row-1 → col-1 → in-1.
fn wire_application_tree() -> serde_json::Value {
    json!({
        "id": "app-1",
        "title": "Grant Form",
        "slug": "intake",
        "sections": [{
            "id": "sec-1",
            "application_id": "app-1",
            "title": "Personal",
            "num_of_cols": 2,
            "rows": [{
                "id": "row-1",
                "section_id": "sec-1",
                "columns": [{
                    "id": "col-1",
                    "row_id": "row-1",
                    "section_id": "sec-1",
                    "input": {
                        "id": "in-1",
                        "column_id": "col-1",
                        "type": "text",
                        "label": "Name"
                    }
                }]
            }]
        }]
    })
}

async fn seeded_session() -> (Arc<StubTransport>, SessionCoordinator<Arc<StubTransport>>) {
    init_tracing();
    let transport = Arc::new(StubTransport::new());
    transport.stub_json(Method::Get, "applications/intake", 200, wire_application_tree());
    let mut session = SessionCoordinator::new(transport.clone());
    session.fetch_application("intake").await.unwrap();
    (transport, session)
}

#[tokio::test]
async fn fetch_populates_all_tables() {
    let (_, session) = seeded_session().await;
    let store = session.store();

    let rows = select::rows_of(store, "sec-1").unwrap();
    assert_eq!(rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["row-1"]);

    let columns = select::columns_of(store, "row-1").unwrap();
    assert_eq!(
        columns.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
        ["col-1"]
    );

    let input = select::input_of(store, "col-1").unwrap().unwrap();
    assert_eq!(input.input_type, "text");
    assert_eq!(input.label, "Name");
}

#[tokio::test]
async fn creating_rows_in_sequence_preserves_order() {
    let (transport, mut session) = seeded_session().await;
    for id in ["row-2", "row-3", "row-4"] {
        transport.stub_json(
            Method::Post,
            "rows",
            200,
            json!({"id": id, "section_id": "sec-1", "columns": []}),
        );
        session
            .create_row(CreateRowAttributes {
                num_of_cols: 2,
                section_id: "sec-1".to_string(),
            })
            .await
            .unwrap();
    }
    let rows = select::rows_of(session.store(), "sec-1").unwrap();
    assert_eq!(
        rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
        ["row-1", "row-2", "row-3", "row-4"]
    );
}

#[tokio::test]
async fn create_row_returns_server_created_columns() {
    let (transport, mut session) = seeded_session().await;
    transport.stub_json(
        Method::Post,
        "rows",
        200,
        json!({
            "id": "row-2",
            "section_id": "sec-1",
            "columns": [
                {"id": "col-a", "row_id": "row-2", "section_id": "sec-1"},
                {"id": "col-b", "row_id": "row-2", "section_id": "sec-1"},
            ]
        }),
    );
    let tree = session
        .create_row(CreateRowAttributes {
            num_of_cols: 2,
            section_id: "sec-1".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(tree.row.id, "row-2");
    assert_eq!(
        tree.columns.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
        ["col-a", "col-b"]
    );
}

#[tokio::test]
async fn outgoing_bodies_are_snake_cased() {
    let (transport, mut session) = seeded_session().await;
    transport.stub_json(
        Method::Post,
        "sections",
        200,
        json!({
            "id": "sec-2",
            "application_id": "app-1",
            "title": "Employment",
            "num_of_cols": 3
        }),
    );
    let section = session
        .create_section(CreateSectionAttributes {
            title: "Employment".to_string(),
            details: None,
            num_of_cols: 3,
            application_id: "app-1".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(section.application_id, "app-1");

    let requests = transport.recorded_requests();
    let body = requests.last().unwrap().body.as_ref().unwrap();
    assert_eq!(body["num_of_cols"], json!(3));
    assert_eq!(body["application_id"], json!("app-1"));
    assert!(body.get("numOfCols").is_none());

    // And the section landed at the end of the application's list.
    let app = session.store().application("app-1").unwrap();
    assert_eq!(app.sections, ["sec-1", "sec-2"]);
}

#[tokio::test]
async fn created_column_inherits_section_from_row() {
    let (transport, mut session) = seeded_session().await;
    // Creation response omits section_id entirely.
    transport.stub_json(
        Method::Post,
        "columns",
        200,
        json!({"id": "col-2", "row_id": "row-1"}),
    );
    let column = session
        .create_column(CreateColumnAttributes {
            row_id: "row-1".to_string(),
            section_id: "sec-1".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(column.section_id, "sec-1");
    assert_eq!(
        session.store().row("row-1").unwrap().columns,
        ["col-1", "col-2"]
    );
}

#[tokio::test]
async fn create_input_attaches_to_its_column() {
    let (transport, mut session) = seeded_session().await;
    transport.stub_json(
        Method::Post,
        "columns",
        200,
        json!({"id": "col-2", "row_id": "row-1"}),
    );
    session
        .create_column(CreateColumnAttributes {
            row_id: "row-1".to_string(),
            section_id: "sec-1".to_string(),
        })
        .await
        .unwrap();

    transport.stub_json(
        Method::Post,
        "inputs",
        200,
        json!({"id": "in-2", "type": "choice", "label": "Country"}),
    );
    let input = session
        .create_input(CreateInputAttributes {
            column_id: "col-2".to_string(),
            input_type: "choice".to_string(),
            label: "Country".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(input.column_id.as_deref(), Some("col-2"));

    let stored = select::input_of(session.store(), "col-2").unwrap().unwrap();
    assert_eq!(stored.label, "Country");
}

#[tokio::test]
async fn update_section_keeps_child_rows() {
    let (transport, mut session) = seeded_session().await;
    // Update responses carry fields, not children.
    transport.stub_json(
        Method::Put,
        "sections/sec-1",
        200,
        json!({
            "id": "sec-1",
            "application_id": "app-1",
            "title": "Renamed",
            "num_of_cols": 4
        }),
    );
    let section = session
        .update_section(UpdateSectionAttributes {
            id: "sec-1".to_string(),
            title: Some("Renamed".to_string()),
            details: None,
            num_of_cols: Some(4),
        })
        .await
        .unwrap();
    assert_eq!(section.title.as_deref(), Some("Renamed"));
    assert_eq!(section.num_of_cols, Some(4));
    assert_eq!(session.store().section("sec-1").unwrap().rows, ["row-1"]);
}

#[tokio::test]
async fn list_applications_merges_each_record() {
    init_tracing();
    let transport = Arc::new(StubTransport::new());
    transport.stub_json(
        Method::Get,
        "applications",
        200,
        json!([
            {"id": "app-1", "title": "Grant Form"},
            {"id": "app-2", "title": "Visa Form"},
        ]),
    );
    let mut session = SessionCoordinator::new(transport);
    let applications = session.list_applications().await.unwrap();
    assert_eq!(applications.len(), 2);
    assert!(session.store().contains(EntityKind::Application, "app-2"));
}

#[tokio::test]
async fn failed_delete_leaves_store_unchanged() {
    let (transport, mut session) = seeded_session().await;
    transport.stub_empty(Method::Delete, "rows/row-1", 500);

    let err = session.delete_row("row-1").await.unwrap_err();
    assert!(matches!(err, FormError::Operation { .. }));
    assert_eq!(err.upstream_status(), Some(500));
    assert_eq!(err.to_string(), "Failed to delete row.");

    let store = session.store();
    assert!(store.contains(EntityKind::Row, "row-1"));
    assert!(store.contains(EntityKind::Column, "col-1"));
    assert_eq!(store.section("sec-1").unwrap().rows, ["row-1"]);
}

#[tokio::test]
async fn failed_create_materializes_nothing() {
    init_tracing();
    let transport = Arc::new(StubTransport::new());
    transport.stub_empty(Method::Post, "applications", 422);
    let mut session = SessionCoordinator::new(transport);
    let err = session
        .create_application(quikapply_core::model::CreateApplicationAttributes {
            title: "Doomed".to_string(),
            details: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.upstream_status(), Some(422));
    assert!(session.store().is_empty());
}

#[tokio::test]
async fn deleting_a_section_cascades_through_the_tree() {
    let (transport, mut session) = seeded_session().await;
    transport.stub_empty(Method::Delete, "sections/sec-1", 200);

    session.delete_section("sec-1").await.unwrap();

    let store = session.store();
    assert!(!store.contains(EntityKind::Section, "sec-1"));
    assert!(!store.contains(EntityKind::Row, "row-1"));
    assert!(!store.contains(EntityKind::Column, "col-1"));
    assert!(!store.contains(EntityKind::Input, "in-1"));
    assert!(store.application("app-1").unwrap().sections.is_empty());
}

#[tokio::test]
async fn delete_column_reports_owning_row() {
    let (transport, mut session) = seeded_session().await;
    transport.stub_json(
        Method::Delete,
        "columns/col-1",
        200,
        json!({"column_id": "col-1", "row_id": "row-1"}),
    );
    let outcome = session.delete_column("col-1").await.unwrap();
    assert_eq!(outcome.column_id, "col-1");
    assert_eq!(outcome.row_id, "row-1");

    let store = session.store();
    assert!(!store.contains(EntityKind::Column, "col-1"));
    assert!(!store.contains(EntityKind::Input, "in-1"));
    assert!(store.row("row-1").unwrap().columns.is_empty());
}

#[tokio::test]
async fn delete_column_falls_back_to_stored_row_reference() {
    let (transport, mut session) = seeded_session().await;
    transport.stub_empty(Method::Delete, "columns/col-1", 200);
    let outcome = session.delete_column("col-1").await.unwrap();
    assert_eq!(outcome.row_id, "row-1");
}

#[tokio::test]
async fn publish_flips_the_flag_on_the_loaded_application() {
    let (transport, mut session) = seeded_session().await;
    transport.stub_empty(Method::Patch, "applications/intake/publish", 200);

    let slug = session.publish_application("intake").await.unwrap();
    assert_eq!(slug, "intake");
    assert!(session.store().application("app-1").unwrap().published);
}

#[tokio::test]
async fn fetch_section_merges_sibling_application() {
    init_tracing();
    let transport = Arc::new(StubTransport::new());
    transport.stub_json(
        Method::Get,
        "sections/sec-7",
        200,
        json!({
            "id": "sec-7",
            "title": "History",
            "num_of_cols": 1,
            "rows": [{"id": "row-7", "section_id": "sec-7", "columns": []}],
            "application": {"id": "app-7", "title": "Visa Form"}
        }),
    );
    let mut session = SessionCoordinator::new(transport);
    let section = session.fetch_section("sec-7").await.unwrap();
    assert_eq!(section.application_id, "app-7");
    assert_eq!(section.rows, ["row-7"]);
    assert_eq!(
        session.store().application("app-7").unwrap().title.as_deref(),
        Some("Visa Form")
    );
}

#[tokio::test]
async fn malformed_fetch_merges_nothing() {
    init_tracing();
    let transport = Arc::new(StubTransport::new());
    // Innermost column is missing its id.
    transport.stub_json(
        Method::Get,
        "applications/broken",
        200,
        json!({
            "id": "app-9",
            "title": "Broken",
            "sections": [{
                "id": "sec-9",
                "application_id": "app-9",
                "title": "S",
                "num_of_cols": 1,
                "rows": [{
                    "id": "row-9",
                    "section_id": "sec-9",
                    "columns": [{"row_id": "row-9"}]
                }]
            }]
        }),
    );
    let mut session = SessionCoordinator::new(transport);
    let err = session.fetch_application("broken").await.unwrap_err();
    assert!(matches!(err, FormError::Integrity(_)));
    assert!(session.store().is_empty());
}

#[tokio::test]
async fn fetch_accepts_payload_without_back_references() {
    init_tracing();
    let transport = Arc::new(StubTransport::new());
    // Nothing below the root names its parent; the tree shape carries that.
    transport.stub_json(
        Method::Get,
        "applications/sparse",
        200,
        json!({
            "id": "app-1",
            "slug": "sparse",
            "sections": [{
                "id": "sec-1",
                "rows": [{
                    "id": "row-1",
                    "columns": [{
                        "id": "col-1",
                        "input": {"id": "in-1", "type": "text", "label": "Name"}
                    }]
                }]
            }]
        }),
    );
    let mut session = SessionCoordinator::new(transport);
    session.fetch_application("sparse").await.unwrap();
    let store = session.store();

    assert_eq!(store.section("sec-1").unwrap().application_id, "app-1");
    assert_eq!(store.row("row-1").unwrap().section_id, "sec-1");
    let column = store.column("col-1").unwrap();
    assert_eq!(column.row_id, "row-1");
    assert_eq!(column.section_id, "sec-1");
    let input = select::input_of(store, "col-1").unwrap().unwrap();
    assert_eq!(input.id, "in-1");
}

#[tokio::test]
async fn list_entries_do_not_wipe_loaded_trees() {
    let (transport, mut session) = seeded_session().await;
    // Listing entries carry no children.
    transport.stub_json(
        Method::Get,
        "applications",
        200,
        json!([{"id": "app-1", "title": "Grant Form", "slug": "intake"}]),
    );
    session.list_applications().await.unwrap();

    assert_eq!(session.store().application("app-1").unwrap().sections, ["sec-1"]);
    let rows = select::rows_of(session.store(), "sec-1").unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn create_section_without_loaded_parent_still_succeeds() {
    init_tracing();
    let transport = Arc::new(StubTransport::new());
    transport.stub_json(
        Method::Post,
        "sections",
        200,
        json!({"id": "sec-5", "application_id": "app-5", "title": "Extra"}),
    );
    let mut session = SessionCoordinator::new(transport);
    let section = session
        .create_section(CreateSectionAttributes {
            title: "Extra".to_string(),
            details: None,
            num_of_cols: 1,
            application_id: "app-5".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(section.id, "sec-5");
    assert!(session.store().contains(EntityKind::Section, "sec-5"));
    assert!(session.store().find_application("app-5").is_none());
}

#[tokio::test]
async fn submission_posts_the_answers() {
    let (transport, mut session) = seeded_session().await;
    transport.stub_json(Method::Post, "submissions", 201, json!({"id": "sub-1"}));
    let mut values = HashMap::new();
    values.insert("in-1".to_string(), json!("Ada Lovelace"));
    session
        .submit_application(CreateSubmissionAttributes {
            application_id: "app-1".to_string(),
            values,
        })
        .await
        .unwrap();

    let requests = transport.recorded_requests();
    let post = requests.last().unwrap();
    let body = post.body.as_ref().unwrap();
    assert_eq!(body["application_id"], json!("app-1"));
    assert_eq!(body["values"]["in-1"], json!("Ada Lovelace"));
}

#[tokio::test]
async fn failed_submission_reports_its_message() {
    let (transport, mut session) = seeded_session().await;
    transport.stub_empty(Method::Post, "submissions", 500);
    let err = session
        .submit_application(CreateSubmissionAttributes {
            application_id: "app-1".to_string(),
            values: HashMap::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Failed to submit application.");
}
