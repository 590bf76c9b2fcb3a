//! Record kinds persisted by the backup scheduler.
//!
//! # Invariants
//! - `Group` and `Period` are keyed by their natural `name`.
//! - `Qube` is keyed by a generated `id` whenever one is not supplied.

use crate::id;
use crate::model::record::Record;
use serde::{Deserialize, Deserializer, Serialize};

/// Named backup schedule, e.g. `daily` or `monthly`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub name: String,
}

impl Period {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Record for Period {
    const FIELDS: &'static [&'static str] = &["name"];
    const KEY_FIELD: &'static str = "name";

    fn keyid(&self) -> String {
        self.name.clone()
    }
}

/// Set of qubes backed up together on one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Name of the `Period` driving this group.
    pub period: String,
}

impl Group {
    pub fn new(name: impl Into<String>, period: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            period: period.into(),
        }
    }
}

impl Record for Group {
    const FIELDS: &'static [&'static str] = &["name", "period"];
    const KEY_FIELD: &'static str = "name";

    fn keyid(&self) -> String {
        self.name.clone()
    }
}

/// A virtual machine enrolled in a backup group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qube {
    #[serde(default = "crate::id::generate", deserialize_with = "id_or_generated")]
    pub id: String,
    pub name: String,
    pub group_name: String,
}

impl Qube {
    /// Creates a qube with a freshly generated id.
    pub fn new(name: impl Into<String>, group_name: impl Into<String>) -> Self {
        Self::with_id(id::generate(), name, group_name)
    }

    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        group_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group_name: group_name.into(),
        }
    }
}

impl Record for Qube {
    const FIELDS: &'static [&'static str] = &["id", "name", "group_name"];

    fn keyid(&self) -> String {
        self.id.clone()
    }
}

fn id_or_generated<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .filter(|id| !id.is_empty())
        .unwrap_or_else(id::generate))
}
