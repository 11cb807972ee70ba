// src/handlers/sheets.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{SqlitePool, types::Json as SqlJson};

use crate::{
    error::AppError,
    handlers::{audit, exams::fetch_owned_exam},
    models::{
        answer_key::AnswerKey,
        sheet::{DuplicateSheetAlert, ScanAlerts, Sheet, SubmitSheetRequest},
    },
    utils::jwt::Claims,
};

/// Raw score for one sheet: positions where the submitted choice equals
/// the key choice, case-insensitive, both non-blank.
pub(crate) fn raw_score(key: &[String], answers: &[String]) -> i64 {
    key.iter()
        .zip(answers.iter())
        .filter(|(k, a)| !k.is_empty() && !a.is_empty() && k.eq_ignore_ascii_case(a))
        .count() as i64
}

/// Ingests one scanned sheet for an exam.
///
/// Matches the scanned student number against the roster; sheets with a
/// missing or unmatched number are stored flagged as null-ID and sit in
/// the alert queue instead of the scoring pool. The raw score is
/// computed against the current answer key (0 when no key is saved yet).
pub async fn submit_sheet(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SubmitSheetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_owned_exam(&pool, id, &claims).await?;

    if payload.answers.len() != exam.num_items as usize {
        return Err(AppError::BadRequest(format!(
            "Sheet must have {} answers, got {}",
            exam.num_items,
            payload.answers.len()
        )));
    }

    // Uppercase what was scanned; unrecognized marks are kept verbatim
    // so the alert view can show exactly what the scanner read.
    let answers: Vec<String> = payload
        .answers
        .iter()
        .map(|a| a.trim().to_uppercase())
        .collect();

    let student_number = payload
        .student_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let student_id: Option<i64> = match &student_number {
        Some(number) => sqlx::query_scalar::<_, i64>(
            "SELECT id FROM students WHERE exam_id = ? AND student_number = ?",
        )
        .bind(id)
        .bind(number)
        .fetch_optional(&pool)
        .await?,
        None => None,
    };

    let is_null_id = student_id.is_none();

    let key = sqlx::query_as::<_, AnswerKey>(
        "SELECT exam_id, answers, locked, updated_at FROM answer_keys WHERE exam_id = ?",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?;

    let score = match &key {
        Some(key) => raw_score(&key.answers.0, &answers),
        None => 0,
    };

    let sheet = sqlx::query_as::<_, Sheet>(
        r#"
        INSERT INTO sheets (exam_id, student_number, student_id, answers, is_null_id, score)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, exam_id, student_number, student_id, answers, is_null_id, score, scanned_at
        "#,
    )
    .bind(id)
    .bind(&student_number)
    .bind(student_id)
    .bind(SqlJson(answers))
    .bind(is_null_id)
    .bind(score)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to store sheet: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    audit::record(
        &pool,
        claims.user_id(),
        "sheet_scanned",
        Some(id),
        student_number.as_deref().unwrap_or("<no id>"),
    )
    .await;

    Ok((StatusCode::CREATED, Json(sheet)))
}

/// Lists all scanned sheets for an exam, newest first.
pub async fn list_sheets(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_exam(&pool, id, &claims).await?;

    let sheets = sqlx::query_as::<_, Sheet>(
        r#"
        SELECT id, exam_id, student_number, student_id, answers, is_null_id, score, scanned_at
        FROM sheets
        WHERE exam_id = ?
        ORDER BY id DESC
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(sheets))
}

/// Deletes one scanned sheet (e.g., a bad scan being redone).
pub async fn delete_sheet(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((id, sheet_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_exam(&pool, id, &claims).await?;

    let result = sqlx::query("DELETE FROM sheets WHERE id = ? AND exam_id = ?")
        .bind(sheet_id)
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Sheet not found".to_string()));
    }

    audit::record(
        &pool,
        claims.user_id(),
        "sheet_deleted",
        Some(id),
        &sheet_id.to_string(),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Lists sheets needing instructor review: null-ID sheets and roster
/// numbers that appear on more than one sheet.
pub async fn list_alerts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_exam(&pool, id, &claims).await?;

    let null_id_sheets = sqlx::query_as::<_, Sheet>(
        r#"
        SELECT id, exam_id, student_number, student_id, answers, is_null_id, score, scanned_at
        FROM sheets
        WHERE exam_id = ? AND is_null_id = 1
        ORDER BY id
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let duplicate_students = sqlx::query_as::<_, DuplicateSheetAlert>(
        r#"
        SELECT student_number, COUNT(*) AS sheet_count
        FROM sheets
        WHERE exam_id = ? AND is_null_id = 0
        GROUP BY student_number
        HAVING COUNT(*) > 1
        ORDER BY student_number
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ScanAlerts {
        null_id_sheets,
        duplicate_students,
    }))
}
