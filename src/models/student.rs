// src/models/student.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

static STUDENT_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Za-z0-9-]{1,32}$").expect("valid pattern"));

/// Represents the 'students' roster table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub exam_id: i64,

    /// The number printed/bubbled on the answer sheet.
    pub student_number: String,

    pub name: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One roster row in a bulk import payload.
#[derive(Debug, Deserialize, Validate)]
pub struct StudentEntry {
    #[validate(custom(function = validate_student_number))]
    pub student_number: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// DTO for bulk roster import.
#[derive(Debug, Deserialize, Validate)]
pub struct ImportStudentsRequest {
    #[validate(nested)]
    pub students: Vec<StudentEntry>,
}

/// Validates the scanner-readable student number format.
fn validate_student_number(value: &str) -> Result<(), validator::ValidationError> {
    if !STUDENT_NUMBER_RE.is_match(value) {
        return Err(validator::ValidationError::new("invalid_student_number"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_student_numbers() {
        assert!(validate_student_number("2024-0157").is_ok());
        assert!(validate_student_number("S123456").is_ok());
    }

    #[test]
    fn rejects_blank_and_oddball_numbers() {
        assert!(validate_student_number("").is_err());
        assert!(validate_student_number("12 34").is_err());
        assert!(validate_student_number("id#99").is_err());
        assert!(validate_student_number(&"9".repeat(33)).is_err());
    }
}
