// src/models/sheet.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// Represents the 'sheets' table in the database: one scanned answer
/// sheet per row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Sheet {
    pub id: i64,
    pub exam_id: i64,

    /// Student number as read by the scanner, if any.
    pub student_number: Option<String>,

    /// Matched roster row, when the number resolved.
    pub student_id: Option<i64>,

    /// One entry per question; "" marks a blank.
    /// Stored as a JSON array in the database.
    pub answers: Json<Vec<String>>,

    /// Set when the student number was missing or unmatched. Null-ID
    /// sheets are excluded from scoring and analysis until resolved.
    pub is_null_id: bool,

    /// Raw score computed against the answer key at scan time.
    pub score: i64,

    pub scanned_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for ingesting one scanned sheet.
#[derive(Debug, Deserialize)]
pub struct SubmitSheetRequest {
    pub student_number: Option<String>,
    pub answers: Vec<String>,
}

/// A roster entry that appears on more than one scanned sheet.
#[derive(Debug, Serialize, FromRow)]
pub struct DuplicateSheetAlert {
    pub student_number: String,
    pub sheet_count: i64,
}

/// Sheets needing instructor review before analysis is trustworthy.
#[derive(Debug, Serialize)]
pub struct ScanAlerts {
    pub null_id_sheets: Vec<Sheet>,
    pub duplicate_students: Vec<DuplicateSheetAlert>,
}
