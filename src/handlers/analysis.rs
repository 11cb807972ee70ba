// src/handlers/analysis.rs

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    analysis::{self, ExamShape, ItemAnalysis, SheetInput},
    error::AppError,
    handlers::exams::fetch_owned_exam,
    models::{answer_key::AnswerKey, sheet::Sheet},
    utils::jwt::Claims,
};

/// Envelope around the analysis so the dashboard can render an explicit
/// empty state instead of misleading zero percentages.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    /// "ok", "no_answer_key" or "no_valid_sheets".
    pub status: &'static str,
    pub analysis: Option<ItemAnalysis>,
}

/// Runs item analysis for an exam over its answer key and all scanned
/// non-null-ID sheets. Recomputed from scratch on every request.
pub async fn get_analysis(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_owned_exam(&pool, id, &claims).await?;

    let key = sqlx::query_as::<_, AnswerKey>(
        "SELECT exam_id, answers, locked, updated_at FROM answer_keys WHERE exam_id = ?",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?;

    let Some(key) = key else {
        return Ok(Json(AnalysisResponse {
            status: "no_answer_key",
            analysis: None,
        }));
    };

    let sheets = sqlx::query_as::<_, Sheet>(
        r#"
        SELECT id, exam_id, student_number, student_id, answers, is_null_id, score, scanned_at
        FROM sheets
        WHERE exam_id = ?
        ORDER BY id
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let shape = ExamShape {
        num_items: exam.num_items as usize,
        choices_per_item: exam.choices_per_item as usize,
    };

    // Blank strings from storage become explicit non-answers.
    let key_entries: Vec<Option<String>> = key
        .answers
        .0
        .iter()
        .map(|a| {
            if a.is_empty() {
                None
            } else {
                Some(a.clone())
            }
        })
        .collect();

    let inputs: Vec<SheetInput> = sheets
        .iter()
        .map(|s| SheetInput {
            answers: s
                .answers
                .0
                .iter()
                .map(|a| {
                    if a.is_empty() {
                        None
                    } else {
                        Some(a.clone())
                    }
                })
                .collect(),
            is_null_id: s.is_null_id,
        })
        .collect();

    let result = analysis::analyze(&shape, &key_entries, &inputs);

    let status = if result.total_papers == 0 {
        "no_valid_sheets"
    } else {
        "ok"
    };

    Ok(Json(AnalysisResponse {
        status,
        analysis: Some(result),
    }))
}

/// Score distribution across the valid sheets of one exam.
#[derive(Debug, Serialize)]
pub struct ScoreSummary {
    pub total_sheets: usize,
    pub mean: f64,
    pub highest: i64,
    pub lowest: i64,
    /// Count of sheets per raw score.
    pub histogram: BTreeMap<i64, u32>,
}

fn summarize(scores: &[i64]) -> ScoreSummary {
    if scores.is_empty() {
        return ScoreSummary {
            total_sheets: 0,
            mean: 0.0,
            highest: 0,
            lowest: 0,
            histogram: BTreeMap::new(),
        };
    }

    let mut histogram = BTreeMap::new();
    for score in scores {
        *histogram.entry(*score).or_insert(0u32) += 1;
    }

    let sum: i64 = scores.iter().sum();
    let mean = (sum as f64 / scores.len() as f64 * 100.0).round() / 100.0;

    ScoreSummary {
        total_sheets: scores.len(),
        mean,
        highest: scores.iter().copied().max().unwrap_or(0),
        lowest: scores.iter().copied().min().unwrap_or(0),
        histogram,
    }
}

/// Summarizes raw scores across the exam's valid sheets for the results
/// table header.
pub async fn get_summary(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_exam(&pool, id, &claims).await?;

    let scores = sqlx::query_scalar::<_, i64>(
        "SELECT score FROM sheets WHERE exam_id = ? AND is_null_id = 0",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(summarize(&scores)))
}
