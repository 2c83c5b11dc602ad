use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One immutable audit log entry. Never updated or deleted by the application.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub actor_user_id: Option<Uuid>,
    pub actor_email: Option<String>,
    #[sqlx(try_from = "String")]
    pub action: AuditAction,
    #[sqlx(try_from = "String")]
    pub resource: AuditResource,
    pub resource_id: Option<String>,
    pub details: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What was done. Unknown tokens are kept as `Other` rather than rejected:
/// a log that drops events it does not understand is worse than one with
/// an unrecognized verb in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Read,
    Update,
    Delete,
    Login,
    Logout,
    Export,
    Import,
    Other(String),
}

impl AuditAction {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "CREATE" => AuditAction::Create,
            "READ" => AuditAction::Read,
            "UPDATE" => AuditAction::Update,
            "DELETE" => AuditAction::Delete,
            "LOGIN" => AuditAction::Login,
            "LOGOUT" => AuditAction::Logout,
            "EXPORT" => AuditAction::Export,
            "IMPORT" => AuditAction::Import,
            _ => AuditAction::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Read => "READ",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::Export => "EXPORT",
            AuditAction::Import => "IMPORT",
            AuditAction::Other(s) => s,
        }
    }
}

/// What the action touched. Same `Other` fallback as [`AuditAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResource {
    User,
    Vendor,
    Contract,
    Auth,
    System,
    Other(String),
}

impl AuditResource {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "USER" => AuditResource::User,
            "VENDOR" => AuditResource::Vendor,
            "CONTRACT" => AuditResource::Contract,
            "AUTH" => AuditResource::Auth,
            "SYSTEM" => AuditResource::System,
            _ => AuditResource::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AuditResource::User => "USER",
            AuditResource::Vendor => "VENDOR",
            AuditResource::Contract => "CONTRACT",
            AuditResource::Auth => "AUTH",
            AuditResource::System => "SYSTEM",
            AuditResource::Other(s) => s,
        }
    }
}

macro_rules! string_enum_impls {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                $ty::parse(&s)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($ty::parse(&s))
            }
        }
    };
}

string_enum_impls!(AuditAction);
string_enum_impls!(AuditResource);

/// A single field mutation captured on UPDATE events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub before: serde_json::Value,
    pub after: serde_json::Value,
}

/// Typed view over the open-ended `metadata` payload. The one shape the
/// application recognizes is `{"changes": {field: {before, after}}}`;
/// anything else is carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditMetadata {
    Changes(BTreeMap<String, FieldChange>),
    Opaque(serde_json::Value),
}

impl AuditMetadata {
    pub fn from_value(value: &serde_json::Value) -> Self {
        if let Some(changes) = value.get("changes") {
            if let Ok(map) =
                serde_json::from_value::<BTreeMap<String, FieldChange>>(changes.clone())
            {
                return AuditMetadata::Changes(map);
            }
        }
        AuditMetadata::Opaque(value.clone())
    }

    /// Render for display: structured before/after values become text so the
    /// UI never has to recurse into nested JSON.
    pub fn expanded(&self) -> serde_json::Value {
        match self {
            AuditMetadata::Changes(map) => {
                let changes: serde_json::Map<String, serde_json::Value> = map
                    .iter()
                    .map(|(field, change)| {
                        (
                            field.clone(),
                            serde_json::json!({
                                "before": render_value(&change.before),
                                "after": render_value(&change.after),
                            }),
                        )
                    })
                    .collect();
                serde_json::json!({ "changes": changes })
            }
            AuditMetadata::Opaque(value) => value.clone(),
        }
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
