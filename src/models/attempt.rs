// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::quiz::Question;

/// One answer as evaluated by the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub question_id: String,
    pub selected_option_ids: Vec<String>,
    pub is_correct: bool,
    pub score_awarded: i32,
}

/// Represents the 'quiz_attempts' table. Rows are written once and never updated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_scored: bool,
    pub answers: Vec<AnswerResult>,
    pub total_score: i32,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the attempts table.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub quiz_id: i64,
    pub user_id: i64,
    pub submitted_at: DateTime<Utc>,
    pub is_scored: bool,
    pub answers: Vec<AnswerResult>,
    pub total_score: i32,
}

/// One answer as sent by the student.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: String,
    #[serde(default)]
    pub selected_option_ids: Vec<String>,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    #[validate(length(max = 500, message = "Too many answers"))]
    pub answers: Vec<SubmittedAnswer>,
}

/// Response for an accepted submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReceipt {
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub total_score: i32,
    pub is_scored: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub total_score: i32,
    pub answers: Vec<AnswerResult>,
}

#[derive(Debug, Serialize)]
pub struct ResultQuiz {
    pub questions: Vec<Question>,
}

/// Response for a student's own results once the quiz has ended.
#[derive(Debug, Serialize)]
pub struct AttemptResults {
    pub attempt: AttemptSummary,
    pub quiz: ResultQuiz,
}

/// Row of the per-student score list shown to the quiz's instructor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorResultRow {
    pub usn: String,
    pub student_name: String,
    pub score: i32,
    /// The student's cohort, or `"N/A"` when no profile exists.
    pub year_of_study: serde_json::Value,
    pub attempt_date: DateTime<Utc>,
}
