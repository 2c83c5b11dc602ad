use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::audit::filter::{AuditFilter, PageParams, SortField, SortOrder};
use crate::models::{
    ActionStat, AuditEvent, AuditStats, ResourceStat, UserStat,
};

/// Persist one event. The single INSERT is the durability boundary: it either
/// commits whole or not at all. This is the only statement in the application
/// that writes to `audit_events`; there is no UPDATE or DELETE anywhere.
pub async fn insert(pool: &PgPool, event: &AuditEvent) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_events
         (id, tenant_id, actor_user_id, actor_email, action, resource,
          resource_id, details, metadata, ip_address, user_agent, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(event.id)
    .bind(event.tenant_id)
    .bind(event.actor_user_id)
    .bind(&event.actor_email)
    .bind(event.action.as_str())
    .bind(event.resource.as_str())
    .bind(&event.resource_id)
    .bind(&event.details)
    .bind(&event.metadata)
    .bind(&event.ip_address)
    .bind(&event.user_agent)
    .bind(event.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Append the AND-combined filter clauses. Every caller has already pushed
/// `WHERE tenant_id = $1`; keeping the tenant bind at the call site and the
/// rest here means a query path cannot compile without tenant scoping.
fn push_filter<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a AuditFilter) {
    if let Some(action) = &filter.action {
        qb.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(resource) = &filter.resource {
        qb.push(" AND resource = ").push_bind(resource.as_str());
    }
    if let Some(user_id) = filter.actor_user_id {
        qb.push(" AND actor_user_id = ").push_bind(user_id);
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND created_at <= ").push_bind(end);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        qb.push(" AND (details ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR actor_email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR resource_id ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list(
    pool: &PgPool,
    tenant_id: Uuid,
    filter: &AuditFilter,
    page: PageParams,
    sort_field: SortField,
    sort_order: SortOrder,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT * FROM audit_events WHERE tenant_id = ");
    qb.push_bind(tenant_id);
    push_filter(&mut qb, filter);

    // Sort column and order come from closed enums, never from raw input.
    // The id tie-break keeps ordering stable across pages when timestamps
    // collide, so concurrent writes cannot duplicate or skip a row.
    qb.push(" ORDER BY ")
        .push(sort_field.column())
        .push(" ")
        .push(sort_order.keyword())
        .push(", id ")
        .push(sort_order.keyword());

    qb.push(" LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    qb.build_query_as::<AuditEvent>().fetch_all(pool).await
}

pub async fn count(
    pool: &PgPool,
    tenant_id: Uuid,
    filter: &AuditFilter,
) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM audit_events WHERE tenant_id = ");
    qb.push_bind(tenant_id);
    push_filter(&mut qb, filter);
    qb.build_query_scalar::<i64>().fetch_one(pool).await
}

pub async fn find_by_id_scoped(
    pool: &PgPool,
    id: Uuid,
    tenant_id: Uuid,
) -> Result<Option<AuditEvent>, sqlx::Error> {
    // The id alone is globally unique; the tenant clause is what turns a
    // cross-tenant probe into a plain 404.
    sqlx::query_as::<_, AuditEvent>(
        "SELECT * FROM audit_events WHERE id = $1 AND tenant_id = $2",
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(pool)
    .await
}

/// One keyset-paginated batch for the export stream, newest first. `cursor`
/// is the `(created_at, id)` of the last row already emitted.
pub async fn export_chunk(
    pool: &PgPool,
    tenant_id: Uuid,
    filter: &AuditFilter,
    cursor: Option<(DateTime<Utc>, Uuid)>,
    limit: i64,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT * FROM audit_events WHERE tenant_id = ");
    qb.push_bind(tenant_id);
    push_filter(&mut qb, filter);

    if let Some((ts, id)) = cursor {
        qb.push(" AND (created_at, id) < (")
            .push_bind(ts)
            .push(", ")
            .push_bind(id)
            .push(")");
    }

    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit);

    qb.build_query_as::<AuditEvent>().fetch_all(pool).await
}

pub async fn stats(
    pool: &PgPool,
    tenant_id: Uuid,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
) -> Result<AuditStats, sqlx::Error> {
    let range = AuditFilter {
        start_date,
        end_date,
        ..Default::default()
    };

    let total_logs = count(pool, tenant_id, &range).await?;

    // Trailing 24h window, deliberately independent of the requested range.
    let recent = AuditFilter {
        start_date: Some(Utc::now() - Duration::hours(24)),
        ..Default::default()
    };
    let recent_activity = count(pool, tenant_id, &recent).await?;

    let action_stats = group_counts(pool, tenant_id, &range, "action")
        .await?
        .into_iter()
        .map(|(action, count)| ActionStat {
            action: action.into(),
            count,
        })
        .collect();

    let resource_stats = group_counts(pool, tenant_id, &range, "resource")
        .await?
        .into_iter()
        .map(|(resource, count)| ResourceStat {
            resource: resource.into(),
            count,
        })
        .collect();

    let mut qb = QueryBuilder::new(
        "SELECT actor_user_id, COUNT(*) FROM audit_events WHERE tenant_id = ",
    );
    qb.push_bind(tenant_id);
    push_filter(&mut qb, &range);
    qb.push(" AND actor_user_id IS NOT NULL GROUP BY actor_user_id ORDER BY COUNT(*) DESC");
    let user_stats = qb
        .build_query_as::<(Uuid, i64)>()
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|(user_id, count)| UserStat { user_id, count })
        .collect();

    Ok(AuditStats {
        total_logs,
        recent_activity,
        user_stats,
        resource_stats,
        action_stats,
    })
}

async fn group_counts(
    pool: &PgPool,
    tenant_id: Uuid,
    range: &AuditFilter,
    column: &'static str,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(column)
        .push(", COUNT(*) FROM audit_events WHERE tenant_id = ")
        .push_bind(tenant_id);
    push_filter(&mut qb, range);
    qb.push(" GROUP BY ")
        .push(column)
        .push(" ORDER BY COUNT(*) DESC");
    qb.build_query_as::<(String, i64)>().fetch_all(pool).await
}
