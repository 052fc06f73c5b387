//! JSON entities returned by the REST API.
//!
//! Every field is optional on input: the platform omits properties that do
//! not apply to a given table or field type.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An app (database).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct App {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub date_format: String,
    pub time_zone: String,
    pub has_everyone_on_the_internet: bool,
    pub data_classification: String,
    pub security_properties: SecurityProperties,
}

/// Security flags of an app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityProperties {
    pub allow_clone: bool,
    pub allow_export: bool,
    pub enable_app_tokens: bool,
    pub hide_from_public: bool,
    pub must_be_realm_approved: bool,
    #[serde(rename = "useIPFilter")]
    pub use_ip_filter: bool,
}

/// A table of an app.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    pub id: String,
    pub name: String,
    pub alias: String,
    pub description: String,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub next_record_id: i64,
    pub next_field_id: i64,
    pub default_sort_field_id: i64,
    pub default_sort_order: String,
    pub key_field_id: i64,
    pub single_record_name: String,
    pub plural_record_name: String,
    pub size_limit: String,
    pub space_used: String,
    pub space_remaining: String,
}

/// A field of a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Field {
    pub id: u64,
    pub label: String,
    pub field_type: String,
    /// `formula`, `lookup` or `summary`; empty for plain data fields.
    pub mode: String,
    pub no_wrap: bool,
    pub bold: bool,
    pub required: bool,
    pub appears_by_default: bool,
    pub find_enabled: bool,
    pub unique: bool,
    pub does_data_copy: bool,
    pub field_help: String,
    pub audited: bool,
    pub properties: FieldProperties,
}

impl Field {
    /// Formula text, empty when the field has none.
    #[must_use]
    pub fn formula(&self) -> &str {
        &self.properties.formula
    }

    /// Plain text field that stores its own data (not derived, not a key).
    #[must_use]
    pub fn is_plain_text(&self) -> bool {
        matches!(self.field_type.as_str(), "text" | "text-multi-line")
            && self.mode.is_empty()
            && !self.properties.foreign_key
    }

    /// File attachment field.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.field_type == "file"
    }
}

/// Type-specific properties of a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldProperties {
    pub primary_key: bool,
    pub foreign_key: bool,
    pub num_lines: i64,
    pub max_length: i64,
    pub append_only: bool,
    #[serde(rename = "allowHTML")]
    pub allow_html: bool,
    pub allow_mentions: bool,
    pub sort_as_given: bool,
    pub carry_choices: bool,
    pub allow_new_choices: bool,
    pub formula: String,
    pub default_value: String,
}

/// Tables of one app, as returned by `get_tables`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppTables {
    /// App the tables belong to.
    pub app_id: String,
    /// Tables in API order.
    pub tables: Vec<Table>,
}
