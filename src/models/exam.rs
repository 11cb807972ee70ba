// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,

    /// The instructor who created the exam.
    pub owner_id: i64,

    pub title: String,

    /// Subject or class label (e.g., "Biology 101").
    pub subject: Option<String>,

    /// Number of questions on the answer sheet.
    pub num_items: i64,

    /// Choices per question; labels run A.. up to this count.
    pub choices_per_item: i64,

    /// ISO date the exam was held, if recorded.
    pub exam_date: Option<String>,

    /// Sanitized HTML instructions shown on the dashboard.
    pub instructions: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 100))]
    pub subject: Option<String>,
    #[validate(range(min = 1, max = 200))]
    pub num_items: i64,
    #[validate(range(min = 1, max = 5))]
    pub choices_per_item: i64,
    #[validate(custom(function = validate_iso_date))]
    pub exam_date: Option<String>,
    #[validate(length(max = 20000))]
    pub instructions: Option<String>,
}

/// DTO for updating an exam. Fields are optional.
/// The sheet shape (num_items, choices_per_item) is fixed at creation:
/// scanned sheets and the answer key depend on it.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 100))]
    pub subject: Option<String>,
    #[validate(custom(function = validate_iso_date))]
    pub exam_date: Option<String>,
    #[validate(length(max = 20000))]
    pub instructions: Option<String>,
}

/// Validates a YYYY-MM-DD date string.
fn validate_iso_date(date: &str) -> Result<(), validator::ValidationError> {
    if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(validator::ValidationError::new("invalid_date"));
    }
    Ok(())
}
