// src/handlers/exams.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::audit,
    models::exam::{CreateExamRequest, Exam, UpdateExamRequest},
    utils::{html::clean_html, jwt::Claims},
};

/// Fetches an exam the caller may act on.
///
/// Admins see every exam; instructors only their own. An exam owned by
/// someone else reads as 404, not 403, so exam IDs are not probeable.
pub async fn fetch_owned_exam(
    pool: &SqlitePool,
    exam_id: i64,
    claims: &Claims,
) -> Result<Exam, AppError> {
    let exam = sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, owner_id, title, subject, num_items, choices_per_item,
               exam_date, instructions, created_at
        FROM exams
        WHERE id = ?
        "#,
    )
    .bind(exam_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    if exam.owner_id != claims.user_id() && !claims.is_admin() {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    Ok(exam)
}

/// Query parameters for listing exams.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub subject: Option<String>,
    pub q: Option<String>,
}

/// Lists the caller's exams, optionally filtered by subject and a title
/// search keyword. Admins see all exams.
pub async fn list_exams(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let search_pattern = params.q.map(|k| format!("%{}%", k));

    let exams = sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, owner_id, title, subject, num_items, choices_per_item,
               exam_date, instructions, created_at
        FROM exams
        WHERE (owner_id = ? OR ? = 'admin')
          AND (? IS NULL OR subject = ?)
          AND (? IS NULL OR title LIKE ?)
        ORDER BY id DESC
        "#,
    )
    .bind(claims.user_id())
    .bind(&claims.role)
    .bind(&params.subject)
    .bind(&params.subject)
    .bind(&search_pattern)
    .bind(&search_pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(exams))
}

/// Creates a new exam owned by the caller.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let instructions = payload.instructions.as_deref().map(clean_html);

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        INSERT INTO exams (owner_id, title, subject, num_items, choices_per_item, exam_date, instructions)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id, owner_id, title, subject, num_items, choices_per_item,
                  exam_date, instructions, created_at
        "#,
    )
    .bind(claims.user_id())
    .bind(&payload.title)
    .bind(&payload.subject)
    .bind(payload.num_items)
    .bind(payload.choices_per_item)
    .bind(&payload.exam_date)
    .bind(&instructions)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    audit::record(
        &pool,
        claims.user_id(),
        "exam_created",
        Some(exam.id),
        &exam.title,
    )
    .await;

    Ok((StatusCode::CREATED, Json(exam)))
}

/// Retrieves a single exam by ID.
pub async fn get_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_owned_exam(&pool, id, &claims).await?;
    Ok(Json(exam))
}

/// Updates an exam's descriptive fields.
/// The sheet shape is immutable once the exam exists.
pub async fn update_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    fetch_owned_exam(&pool, id, &claims).await?;

    if payload.title.is_none()
        && payload.subject.is_none()
        && payload.exam_date.is_none()
        && payload.instructions.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE exams SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(subject) = payload.subject {
        separated.push("subject = ");
        separated.push_bind_unseparated(subject);
    }

    if let Some(exam_date) = payload.exam_date {
        separated.push("exam_date = ");
        separated.push_bind_unseparated(exam_date);
    }

    if let Some(instructions) = payload.instructions {
        separated.push("instructions = ");
        separated.push_bind_unseparated(clean_html(&instructions));
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    audit::record(&pool, claims.user_id(), "exam_updated", Some(id), "").await;

    Ok(StatusCode::OK)
}

/// Deletes an exam along with its answer key, roster and sheets.
pub async fn delete_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_owned_exam(&pool, id, &claims).await?;

    // One transaction: either the exam and all its children go, or
    // nothing does. SQLite only enforces the references with a pragma
    // we do not rely on.
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    sqlx::query("DELETE FROM sheets WHERE exam_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM students WHERE exam_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM answer_keys WHERE exam_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM exams WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    audit::record(
        &pool,
        claims.user_id(),
        "exam_deleted",
        Some(id),
        &exam.title,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
