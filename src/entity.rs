//! Entity kinds tracked by the stores.
//!
//! Each kind owns its own identifier space: a contact and a deal may share a
//! numeric id without referring to each other.

use serde::{Deserialize, Serialize};

/// The kind of record a store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Contact,
    Deal,
}

impl EntityKind {
    /// String label for SQL storage and log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Contact => "contact",
            EntityKind::Deal => "deal",
        }
    }

    /// Display label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Contact => "Contact",
            EntityKind::Deal => "Deal",
        }
    }

    /// Table backing this kind in the SQLite store.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Contact => "contacts",
            EntityKind::Deal => "deals",
        }
    }
}
