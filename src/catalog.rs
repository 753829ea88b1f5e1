//! Reference catalog of note types and statuses.
//!
//! The catalog is populated once at bootstrap (see `Context::init_application`)
//! and is read-only afterwards: every `type_id`/`status_id` an entity carries
//! must resolve against it. Lookups are linear; the catalog holds a handful of
//! records.

use serde::{Deserialize, Serialize};

/// Well-known type name used as the default for new notes.
pub const TYPE_LIST: &str = "list";
/// Well-known type name for plain text notes.
pub const TYPE_TEXT: &str = "text";
/// Well-known status name used as the default for new notes.
pub const STATUS_ACTIVE: &str = "active";

/// A note type record as delivered by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    pub id: i64,
    pub name: String,
}

/// A note status record as delivered by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: i64,
    pub name: String,
}

/// In-memory catalog of type and status records.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types: Vec<TypeRecord>,
    statuses: Vec<StatusRecord>,
}

impl Catalog {
    pub fn new(types: Vec<TypeRecord>, statuses: Vec<StatusRecord>) -> Self {
        Self { types, statuses }
    }

    pub fn set_types(&mut self, types: Vec<TypeRecord>) {
        self.types = types;
    }

    pub fn set_statuses(&mut self, statuses: Vec<StatusRecord>) {
        self.statuses = statuses;
    }

    pub fn type_by_id(&self, id: i64) -> Option<&TypeRecord> {
        self.types.iter().find(|t| t.id == id)
    }

    pub fn type_by_name(&self, name: &str) -> Option<&TypeRecord> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn status_by_id(&self, id: i64) -> Option<&StatusRecord> {
        self.statuses.iter().find(|s| s.id == id)
    }

    pub fn status_by_name(&self, name: &str) -> Option<&StatusRecord> {
        self.statuses.iter().find(|s| s.name == name)
    }

    /// The default type for new notes (the "list" type).
    pub fn default_type(&self) -> Option<&TypeRecord> {
        self.type_by_name(TYPE_LIST)
    }

    /// The default status for new notes (the "active" status).
    pub fn active_status(&self) -> Option<&StatusRecord> {
        self.status_by_name(STATUS_ACTIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                TypeRecord {
                    id: 1,
                    name: TYPE_LIST.into(),
                },
                TypeRecord {
                    id: 2,
                    name: TYPE_TEXT.into(),
                },
            ],
            vec![
                StatusRecord {
                    id: 10,
                    name: STATUS_ACTIVE.into(),
                },
                StatusRecord {
                    id: 11,
                    name: "inactive".into(),
                },
            ],
        )
    }

    #[test]
    fn lookup_by_id_and_name() {
        let c = catalog();
        assert_eq!(c.type_by_id(2).unwrap().name, "text");
        assert_eq!(c.status_by_name("inactive").unwrap().id, 11);
        assert!(c.type_by_id(99).is_none());
        assert!(c.status_by_name("archived").is_none());
    }

    #[test]
    fn well_known_defaults() {
        let c = catalog();
        assert_eq!(c.default_type().unwrap().id, 1);
        assert_eq!(c.active_status().unwrap().id, 10);

        let empty = Catalog::default();
        assert!(empty.default_type().is_none());
        assert!(empty.active_status().is_none());
    }
}
