//! Error taxonomy for the entity store and mutation coordinator.
//!
//! Three recoverable failure classes cross the crate boundary: payload
//! integrity violations during normalization, missing-entity reads, and
//! rejected remote mutations. Everything is a typed `Result`; nothing in
//! this crate retries or swallows a failure.

use thiserror::Error;

use crate::model::EntityKind;

pub type Result<T> = std::result::Result<T, FormError>;

#[derive(Debug, Error)]
pub enum FormError {
    /// A payload was structurally unusable, e.g. an entity without an `id`.
    /// Fatal to the fetch that produced it; nothing gets merged.
    #[error("integrity: {0}")]
    Integrity(String),

    /// A read accessor was asked for an entity the store does not hold.
    #[error("not found: {kind} {id}")]
    NotFound { kind: EntityKind, id: String },

    /// A remote mutation was rejected or never completed. Carries the
    /// user-facing message and, when the upstream answered at all, its
    /// HTTP status.
    #[error("{message}")]
    Operation {
        message: String,
        status: Option<u16>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FormError {
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity(message.into())
    }

    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn operation(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Operation {
            message: message.into(),
            status,
        }
    }

    /// Upstream HTTP status, when this failure came back from the service.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Operation { status, .. } => *status,
            _ => None,
        }
    }
}
