// src/handlers/answer_key.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{SqlitePool, types::Json as SqlJson};

use crate::{
    analysis::CHOICE_LABELS,
    error::AppError,
    handlers::{audit, exams::fetch_owned_exam, sheets::raw_score},
    models::{
        answer_key::{AnswerKey, SaveAnswerKeyRequest},
        sheet::Sheet,
    },
    utils::jwt::Claims,
};

async fn fetch_key(pool: &SqlitePool, exam_id: i64) -> Result<Option<AnswerKey>, AppError> {
    let key = sqlx::query_as::<_, AnswerKey>(
        r#"
        SELECT exam_id, answers, locked, updated_at
        FROM answer_keys
        WHERE exam_id = ?
        "#,
    )
    .bind(exam_id)
    .fetch_optional(pool)
    .await?;

    Ok(key)
}

/// Retrieves the answer key for an exam. 404 until one is saved.
pub async fn get_answer_key(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_exam(&pool, id, &claims).await?;

    let key = fetch_key(&pool, id)
        .await?
        .ok_or(AppError::NotFound("No answer key for this exam".to_string()))?;

    Ok(Json(key))
}

/// Saves (creates or replaces) the answer key for an exam.
///
/// The payload must carry exactly one entry per question; each entry is
/// either "" (no correct answer) or a label valid for the exam's
/// choices_per_item, any casing. Stored uppercased. A locked key
/// rejects the save with 409.
pub async fn save_answer_key(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SaveAnswerKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_owned_exam(&pool, id, &claims).await?;

    if payload.answers.len() != exam.num_items as usize {
        return Err(AppError::BadRequest(format!(
            "Answer key must have {} entries, got {}",
            exam.num_items,
            payload.answers.len()
        )));
    }

    let labels = &CHOICE_LABELS[..exam.choices_per_item as usize];
    let mut normalized = Vec::with_capacity(payload.answers.len());
    for (i, answer) in payload.answers.iter().enumerate() {
        let upper = answer.trim().to_uppercase();
        if !upper.is_empty() && !labels.contains(&upper.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Question {}: '{}' is not a valid choice (expected one of {})",
                i + 1,
                answer,
                labels.join(", ")
            )));
        }
        normalized.push(upper);
    }

    if let Some(existing) = fetch_key(&pool, id).await? {
        if existing.locked {
            return Err(AppError::Conflict(
                "Answer key is locked and cannot be changed".to_string(),
            ));
        }
    }

    let key = sqlx::query_as::<_, AnswerKey>(
        r#"
        INSERT INTO answer_keys (exam_id, answers, locked)
        VALUES (?, ?, 0)
        ON CONFLICT(exam_id) DO UPDATE SET
            answers = excluded.answers,
            updated_at = CURRENT_TIMESTAMP
        RETURNING exam_id, answers, locked, updated_at
        "#,
    )
    .bind(id)
    .bind(SqlJson(normalized))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to save answer key: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    // Stored scores were computed against the previous key (or no key);
    // bring already-scanned sheets in line with the new one.
    let sheets = sqlx::query_as::<_, Sheet>(
        r#"
        SELECT id, exam_id, student_number, student_id, answers, is_null_id, score, scanned_at
        FROM sheets
        WHERE exam_id = ?
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    for sheet in &sheets {
        let score = raw_score(&key.answers.0, &sheet.answers.0);
        if score != sheet.score {
            sqlx::query("UPDATE sheets SET score = ? WHERE id = ?")
                .bind(score)
                .bind(sheet.id)
                .execute(&pool)
                .await?;
        }
    }

    audit::record(&pool, claims.user_id(), "answer_key_saved", Some(id), "").await;

    Ok(Json(key))
}

/// Locks the answer key so further saves are rejected. Idempotent.
pub async fn lock_answer_key(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_exam(&pool, id, &claims).await?;

    let result = sqlx::query("UPDATE answer_keys SET locked = 1 WHERE exam_id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("No answer key for this exam".to_string()));
    }

    audit::record(&pool, claims.user_id(), "answer_key_locked", Some(id), "").await;

    Ok(StatusCode::OK)
}
