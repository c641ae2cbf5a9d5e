//! quikapply-core — normalized hierarchical entity store for a multi-page
//! application-form builder.
//!
//! The crate ingests nested API payloads describing an application tree
//! (Application → Section → Row → Column → Input), flattens them into
//! independently addressable entity tables, keeps parent/child reference
//! lists consistent across create/update/delete operations, and rebuilds
//! ordered subtrees on demand for presentation.
//!
//! Data flow: wire payload → [`casing`] adapter → [`normalize`] engine →
//! [`store::EntityStore`] ⇄ [`select`] derivations → consumer. Mutations run
//! the other way through [`coordinator::SessionCoordinator`], which owns the
//! session's store and speaks to the remote service through the
//! [`transport::Transport`] seam.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use quikapply_core::coordinator::SessionCoordinator;
//! use quikapply_core::select;
//! use quikapply_core::transport::HttpTransport;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let transport = HttpTransport::from_env()?;
//! let mut session = SessionCoordinator::new(transport);
//! let application = session.fetch_application("intake-form").await?;
//! for section in select::sections_of(session.store(), &application.id)? {
//!     println!("{}", section.title.as_deref().unwrap_or("untitled"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod casing;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod normalize;
pub mod schema;
pub mod select;
pub mod store;
pub mod transport;

pub use coordinator::SessionCoordinator;
pub use error::{FormError, Result};
pub use model::{Application, Column, EntityKind, Input, Row, Section};
pub use store::EntityStore;
