// src/handlers/students.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{audit, exams::fetch_owned_exam},
    models::student::{ImportStudentsRequest, Student},
    utils::jwt::Claims,
};

/// Lists the roster for an exam.
pub async fn list_students(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_exam(&pool, id, &claims).await?;

    let students = sqlx::query_as::<_, Student>(
        r#"
        SELECT id, exam_id, student_number, name, created_at
        FROM students
        WHERE exam_id = ?
        ORDER BY student_number
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(students))
}

/// Bulk-imports roster rows for an exam.
///
/// Rows whose student number already exists on this exam are skipped,
/// not overwritten; the response reports how many were inserted and how
/// many skipped.
pub async fn import_students(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<ImportStudentsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.students.is_empty() {
        return Err(AppError::BadRequest("No students to import".to_string()));
    }

    fetch_owned_exam(&pool, id, &claims).await?;

    let mut inserted = 0u32;
    let mut skipped = 0u32;

    for entry in &payload.students {
        let result = sqlx::query(
            r#"
            INSERT INTO students (exam_id, student_number, name)
            VALUES (?, ?, ?)
            ON CONFLICT(exam_id, student_number) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(&entry.student_number)
        .bind(&entry.name)
        .execute(&pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }

    audit::record(
        &pool,
        claims.user_id(),
        "roster_imported",
        Some(id),
        &format!("{} inserted, {} skipped", inserted, skipped),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "inserted": inserted,
            "skipped": skipped,
        })),
    ))
}
