// src/models/answer_key.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// Represents the 'answer_keys' table in the database.
/// One row per exam; `answers` has one entry per question, stored
/// uppercased, with "" marking a question that has no correct answer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerKey {
    pub exam_id: i64,

    /// Stored as a JSON array in the database.
    pub answers: Json<Vec<String>>,

    /// Locked keys cannot be changed without unlocking in the database.
    pub locked: bool,

    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for saving an answer key. Length and label validation happens in
/// the handler, against the exam's shape.
#[derive(Debug, Deserialize)]
pub struct SaveAnswerKeyRequest {
    pub answers: Vec<String>,
}
