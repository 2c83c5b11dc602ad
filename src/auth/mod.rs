pub mod extractor;
pub mod jwt;

/// A named permission checked independently of coarse role labels. Reading
/// the audit trail requires `audit:read` explicitly; being an admin is not
/// enough on its own. Tokens carry capabilities as strings so unknown ones
/// pass through harmlessly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    AuditRead,
    AuditWrite,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::AuditRead => "audit:read",
            Capability::AuditWrite => "audit:write",
        }
    }
}
