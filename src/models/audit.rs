// src/models/audit.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Represents the 'audit_log' table in the database.
/// One row per instructor action worth tracing back later.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: i64,

    /// Short machine-readable action tag, e.g. 'exam_created'.
    pub action: String,

    pub exam_id: Option<i64>,

    /// Free-text context for the action.
    pub detail: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
