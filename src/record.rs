//! Record types and identity.
//!
//! The record layer is the prerequisite for reconciliation. Without stable
//! record identifiers, children cannot be bound to parents and upserts
//! cannot distinguish new records from existing ones.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::FieldValue;

/// Globally unique, stable record identifier.
///
/// Identifiers are assigned by the store on creation and never change
/// afterwards. A record without an identifier has not been persisted yet.
///
/// # Examples
///
/// ```
/// use reconciler::RecordId;
///
/// let id = RecordId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random record ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a record ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Creates a nil record ID (for testing or sentinel values).
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RecordId> for Uuid {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

/// Classification of record kinds.
///
/// Kinds partition the store: queries, inserts, and reconciliations always
/// operate within a single kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordKind {
    /// A business account (typical parent in reconciliation).
    Account,
    /// A person attached to an account.
    Contact,
    /// A sales opportunity.
    Opportunity,
    /// An unqualified prospect.
    Lead,
    /// A support case.
    Case,
    /// A custom record kind.
    Custom(String),
}

impl TryFrom<String> for RecordKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err("record kind cannot be empty".to_string());
        }

        let bytes = value.as_bytes();
        if bytes.len() >= 7 && bytes[..7].eq_ignore_ascii_case(b"custom:") {
            let rest = value[7..].trim();
            if rest.is_empty() {
                return Err("custom record kind cannot be empty".to_string());
            }
            return Ok(Self::Custom(rest.to_string()));
        }

        Ok(if value.eq_ignore_ascii_case("account") {
            Self::Account
        } else if value.eq_ignore_ascii_case("contact") {
            Self::Contact
        } else if value.eq_ignore_ascii_case("opportunity") {
            Self::Opportunity
        } else if value.eq_ignore_ascii_case("lead") {
            Self::Lead
        } else if value.eq_ignore_ascii_case("case") {
            Self::Case
        } else {
            return Err(format!(
                "unknown record kind: {value}. Use a built-in kind (account, contact, opportunity, lead, case) or prefix custom kinds with custom:<name>"
            ));
        })
    }
}

impl From<RecordKind> for String {
    fn from(value: RecordKind) -> Self {
        match value {
            RecordKind::Account => "account".to_string(),
            RecordKind::Contact => "contact".to_string(),
            RecordKind::Opportunity => "opportunity".to_string(),
            RecordKind::Lead => "lead".to_string(),
            RecordKind::Case => "case".to_string(),
            RecordKind::Custom(name) => format!("custom:{name}"),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account => write!(f, "account"),
            Self::Contact => write!(f, "contact"),
            Self::Opportunity => write!(f, "opportunity"),
            Self::Lead => write!(f, "lead"),
            Self::Case => write!(f, "case"),
            Self::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

/// A generic business record: a field-value mapping plus an optional
/// store-assigned identifier.
///
/// A record with `id == None` has not been persisted. The store assigns the
/// identifier on insert; it is immutable thereafter.
///
/// # Examples
///
/// ```
/// use reconciler::{Record, RecordKind};
///
/// let contact = Record::new(RecordKind::Contact).field("last_name", "Doe");
/// assert!(contact.id.is_none());
/// assert_eq!(contact.key_string("last_name"), Some("Doe"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identifier; `None` until persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    /// The kind classification of the record.
    pub kind: RecordKind,

    /// Field name to value mapping.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,

    /// When the record was first created.
    pub created_at: DateTime<Utc>,

    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Creates a new unpersisted record of the given kind.
    #[must_use]
    pub fn new(kind: RecordKind) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            kind,
            fields: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a record with a specific identifier.
    ///
    /// This is useful when materializing a record that already exists in the
    /// store, such as during testing or adapter implementations.
    #[must_use]
    pub fn with_id(id: RecordId, kind: RecordKind) -> Self {
        let mut record = Self::new(kind);
        record.id = Some(id);
        record
    }

    /// Sets a field, consuming and returning the record (builder style).
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Sets a field in place, updating `updated_at` if the value changed.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        if self.fields.get(&name) != Some(&value) {
            self.fields.insert(name, value);
            self.touch();
        }
    }

    /// Returns the value of a field, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns the string value of a field.
    ///
    /// Returns `None` when the field is absent or not string-valued.
    /// Matching keys are compared exactly, case-sensitively, with no
    /// normalization; that contract starts here.
    #[must_use]
    pub fn key_string(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_string)
    }

    /// Returns true if the record has been persisted (carries an identifier).
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Updates the `updated_at` timestamp.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            // Persisted records are equal if they have the same identifier.
            (Some(a), Some(b)) => a == b,
            (None, None) => self.kind == other.kind && self.fields == other.fields,
            _ => false,
        }
    }
}

impl Eq for Record {}
