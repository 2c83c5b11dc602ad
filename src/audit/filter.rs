use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{AuditAction, AuditResource};

/// AND-combined filter criteria for the query, stats and export paths.
/// All fields optional; an empty filter matches the whole tenant.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub resource: Option<AuditResource>,
    pub actor_user_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

/// Raw query-string values before validation. Kept separate from
/// [`AuditFilter`] so malformed input is rejected before any SQL is built.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RawFilterParams {
    pub action: Option<String>,
    pub resource: Option<String>,
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
}

impl AuditFilter {
    pub fn from_params(params: &RawFilterParams) -> Result<Self, AppError> {
        // The read side is strict where ingestion is lenient: filtering on a
        // token outside the known set can only ever return nothing, so it is
        // reported as a caller mistake instead of silently matching nothing.
        let action = params
            .action
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| match AuditAction::parse(s) {
                AuditAction::Other(raw) => {
                    Err(AppError::InvalidFilter(format!("Unknown action: {raw}")))
                }
                known => Ok(known),
            })
            .transpose()?;

        let resource = params
            .resource
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| match AuditResource::parse(s) {
                AuditResource::Other(raw) => {
                    Err(AppError::InvalidFilter(format!("Unknown resource: {raw}")))
                }
                known => Ok(known),
            })
            .transpose()?;

        let actor_user_id = params
            .user_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<Uuid>()
                    .map_err(|_| AppError::InvalidFilter(format!("Invalid user_id: {s}")))
            })
            .transpose()?;

        let start_date = parse_date(params.start_date.as_deref(), DateBound::Start)?;
        let end_date = parse_date(params.end_date.as_deref(), DateBound::End)?;

        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(AppError::InvalidFilter(
                    "start_date must not be after end_date".to_string(),
                ));
            }
        }

        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(AuditFilter {
            action,
            resource,
            actor_user_id,
            start_date,
            end_date,
            search,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum DateBound {
    Start,
    End,
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates. A bare date
/// used as a range end covers the whole day (the range is inclusive).
fn parse_date(raw: Option<&str>, bound: DateBound) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }

    if let Ok(date) = raw.parse::<NaiveDate>() {
        let time = match bound {
            DateBound::Start => date.and_hms_opt(0, 0, 0),
            DateBound::End => date.and_hms_micro_opt(23, 59, 59, 999_999),
        };
        // and_hms_opt only fails for out-of-range components, which these are not
        if let Some(naive) = time {
            return Ok(Some(naive.and_utc()));
        }
    }

    Err(AppError::InvalidFilter(format!(
        "Invalid date: {raw} (expected RFC 3339 or YYYY-MM-DD)"
    )))
}

/// Validated offset pagination. `total_pages` and the has-next/has-prev flags
/// are derived from the filtered count, never from the fetched page length.
#[derive(Debug, Clone, Copy)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: Option<i64>, limit: Option<i64>) -> Result<Self, AppError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(50);

        if page < 1 {
            return Err(AppError::InvalidFilter("page must be >= 1".to_string()));
        }
        if !(1..=Self::MAX_LIMIT).contains(&limit) {
            return Err(AppError::InvalidFilter(format!(
                "limit must be between 1 and {}",
                Self::MAX_LIMIT
            )));
        }

        // (page - 1) * limit must stay addressable as an i64 OFFSET.
        if (page - 1).checked_mul(limit).is_none() {
            return Err(AppError::InvalidFilter("page is out of range".to_string()));
        }

        Ok(PageParams { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total_count: i64) -> i64 {
        if total_count == 0 {
            0
        } else {
            (total_count + self.limit - 1) / self.limit
        }
    }

    pub fn has_next(&self, total_count: i64) -> bool {
        self.page < self.total_pages(total_count)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Columns a caller may sort by. A closed set so user input never reaches
/// the ORDER BY clause as raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Action,
    Resource,
    ActorEmail,
}

impl SortField {
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None | Some("timestamp") | Some("created_at") => Ok(SortField::CreatedAt),
            Some("action") => Ok(SortField::Action),
            Some("resource") => Ok(SortField::Resource),
            Some("actor_email") => Ok(SortField::ActorEmail),
            Some(other) => Err(AppError::InvalidFilter(format!(
                "Unsupported sort field: {other}"
            ))),
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Action => "action",
            SortField::Resource => "resource",
            SortField::ActorEmail => "actor_email",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None | Some("desc") => Ok(SortOrder::Desc),
            Some("asc") => Ok(SortOrder::Asc),
            Some(other) => Err(AppError::InvalidFilter(format!(
                "Unsupported sort order: {other}"
            ))),
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}
