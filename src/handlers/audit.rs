// src/handlers/audit.rs

use axum::{
    Json,
    extract::{Extension, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    config::AUDIT_PAGE_LIMIT, error::AppError, models::audit::AuditEntry, utils::jwt::Claims,
};

/// Writes one audit entry. Best-effort: a failed write is logged and
/// never fails the request that triggered it.
pub async fn record(pool: &SqlitePool, user_id: i64, action: &str, exam_id: Option<i64>, detail: &str) {
    let detail = if detail.is_empty() { None } else { Some(detail) };

    let result = sqlx::query(
        r#"
        INSERT INTO audit_log (user_id, action, exam_id, detail)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(action)
    .bind(exam_id)
    .bind(detail)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::error!("Failed to write audit entry '{}': {:?}", action, e);
    }
}

/// Query parameters for listing audit entries.
#[derive(Debug, Deserialize)]
pub struct AuditParams {
    pub limit: Option<i64>,
}

/// Lists recent audit entries. Admins see everything; instructors see
/// their own actions plus anything touching an exam they own (e.g. an
/// admin editing it on their behalf).
pub async fn list_audit(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<AuditParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, AUDIT_PAGE_LIMIT);

    let entries = sqlx::query_as::<_, AuditEntry>(
        r#"
        SELECT id, user_id, action, exam_id, detail, created_at
        FROM audit_log
        WHERE (? = 'admin'
               OR user_id = ?
               OR exam_id IN (SELECT id FROM exams WHERE owner_id = ?))
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(&claims.role)
    .bind(claims.user_id())
    .bind(claims.user_id())
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(entries))
}
