// src/analysis.rs

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{EASY_THRESHOLD, GROUP_FRACTION, HARD_THRESHOLD};

/// Choice labels in display order. An exam uses the first
/// `choices_per_item` of these.
pub const CHOICE_LABELS: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Shape of the exam being analyzed.
#[derive(Debug, Clone, Copy)]
pub struct ExamShape {
    pub num_items: usize,
    pub choices_per_item: usize,
}

/// One scanned sheet, reduced to what the analysis needs.
/// `None` is an unanswered question; `Some` carries the submitted string
/// as scanned, which may or may not be a valid label.
#[derive(Debug, Clone)]
pub struct SheetInput {
    pub answers: Vec<Option<String>>,
    pub is_null_id: bool,
}

/// Qualitative difficulty band derived from the correct rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Per-question statistics. Derived fresh on every call, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionAnalysis {
    /// 1-based question number for display.
    pub question: usize,
    /// Percentage of responding students who chose the correct answer.
    pub correct_rate: u32,
    pub difficulty: Difficulty,
    /// Upper-group correct rate minus lower-group correct rate, in -1.0..=1.0.
    pub discrimination: f64,
    /// Count of responses per valid choice label.
    pub distribution: BTreeMap<String, u32>,
    pub total_responses: u32,
}

/// Full analysis output: per-question breakdown plus exam-level aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct ItemAnalysis {
    pub questions: Vec<QuestionAnalysis>,
    pub avg_correct_rate: u32,
    pub avg_discrimination: f64,
    pub total_papers: usize,
}

impl ItemAnalysis {
    fn empty() -> Self {
        Self {
            questions: Vec::new(),
            avg_correct_rate: 0,
            avg_discrimination: 0.0,
            total_papers: 0,
        }
    }
}

/// Computes item analysis for one exam.
///
/// Pure function of its inputs: no I/O, no shared state, safe to call
/// repeatedly or concurrently. Null-ID sheets are excluded everywhere.
/// An empty answer key yields zero questions; a present key with no
/// valid sheets yields one zeroed entry per question so the caller can
/// still render the table.
pub fn analyze(shape: &ExamShape, key: &[Option<String>], sheets: &[SheetInput]) -> ItemAnalysis {
    if key.is_empty() || shape.num_items == 0 {
        return ItemAnalysis::empty();
    }

    let labels = valid_labels(shape.choices_per_item);

    // Uppercase the key once; blank entries mean "credit never given".
    let key: Vec<Option<String>> = key
        .iter()
        .map(|k| {
            k.as_deref()
                .filter(|s| !s.is_empty())
                .map(str::to_uppercase)
        })
        .collect();

    let valid: Vec<&SheetInput> = sheets.iter().filter(|s| !s.is_null_id).collect();
    let n = valid.len();

    if n == 0 {
        let questions = (0..shape.num_items)
            .map(|i| QuestionAnalysis {
                question: i + 1,
                correct_rate: 0,
                difficulty: classify(0),
                discrimination: 0.0,
                distribution: zero_distribution(labels),
                total_responses: 0,
            })
            .collect();
        return ItemAnalysis {
            questions,
            avg_correct_rate: 0,
            avg_discrimination: 0.0,
            total_papers: 0,
        };
    }

    // Stable descending sort by raw score; ties keep scan order.
    let mut ranked: Vec<(usize, &SheetInput)> =
        valid.iter().map(|s| (raw_score(&key, s), *s)).collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    // Upper/lower 27% groups. The slices overlap when n is very small;
    // that matches how the statistic is defined here.
    let group_size = ((GROUP_FRACTION * n as f64).ceil() as usize).max(1);
    let upper = &ranked[..group_size];
    let lower = &ranked[n - group_size..];

    let mut questions = Vec::with_capacity(shape.num_items);

    for i in 0..shape.num_items {
        let correct = key[i].as_deref();

        let mut distribution = zero_distribution(labels);
        let mut total_responses = 0u32;
        let mut correct_count = 0u32;

        for sheet in &valid {
            let Some(choice) = answer_at(sheet, i) else {
                continue;
            };
            // Submitted strings outside the label set are not responses.
            if let Some(count) = distribution.get_mut(choice.as_str()) {
                *count += 1;
                total_responses += 1;
                if Some(choice.as_str()) == correct {
                    correct_count += 1;
                }
            }
        }

        let correct_rate = if total_responses > 0 {
            (100.0 * f64::from(correct_count) / f64::from(total_responses)).round() as u32
        } else {
            0
        };

        let upper_correct = group_correct(upper, i, correct);
        let lower_correct = group_correct(lower, i, correct);
        let discrimination = round2(
            (upper_correct as f64 - lower_correct as f64) / group_size as f64,
        );

        questions.push(QuestionAnalysis {
            question: i + 1,
            correct_rate,
            difficulty: classify(correct_rate),
            discrimination,
            distribution,
            total_responses,
        });
    }

    let count = questions.len() as f64;
    let avg_correct_rate = (questions.iter().map(|q| f64::from(q.correct_rate)).sum::<f64>()
        / count)
        .round() as u32;
    let avg_discrimination =
        round2(questions.iter().map(|q| q.discrimination).sum::<f64>() / count);

    ItemAnalysis {
        questions,
        avg_correct_rate,
        avg_discrimination,
        total_papers: n,
    }
}

fn valid_labels(choices_per_item: usize) -> &'static [&'static str] {
    &CHOICE_LABELS[..choices_per_item.min(CHOICE_LABELS.len())]
}

fn zero_distribution(labels: &[&str]) -> BTreeMap<String, u32> {
    labels.iter().map(|l| (l.to_string(), 0)).collect()
}

/// Count of positions where the sheet matches the key, both present,
/// case-insensitive.
fn raw_score(key: &[Option<String>], sheet: &SheetInput) -> usize {
    key.iter()
        .enumerate()
        .filter(|(i, k)| {
            matches!((k, answer_at(sheet, *i)), (Some(k), Some(a)) if *k == a)
        })
        .count()
}

/// Uppercased answer at question `i`, or `None` when blank or missing.
fn answer_at(sheet: &SheetInput, i: usize) -> Option<String> {
    sheet
        .answers
        .get(i)
        .and_then(|a| a.as_deref())
        .filter(|a| !a.is_empty())
        .map(str::to_uppercase)
}

fn group_correct(group: &[(usize, &SheetInput)], i: usize, correct: Option<&str>) -> usize {
    let Some(correct) = correct else {
        return 0;
    };
    group
        .iter()
        .filter(|(_, sheet)| answer_at(sheet, i).as_deref() == Some(correct))
        .count()
}

fn classify(correct_rate: u32) -> Difficulty {
    if correct_rate > EASY_THRESHOLD {
        Difficulty::Easy
    } else if correct_rate < HARD_THRESHOLD {
        Difficulty::Hard
    } else {
        Difficulty::Medium
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
