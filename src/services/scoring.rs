// src/services/scoring.rs

//! Scoring engine. Pure functions only: no store access, no clock.

use std::collections::HashSet;

use crate::{
    error::AppError,
    models::{
        attempt::{AnswerResult, SubmittedAnswer},
        quiz::Quiz,
    },
};

/// Outcome of scoring one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub answers: Vec<AnswerResult>,
    pub total_score: i32,
}

/// Scores `submitted` against the quiz's stored answer keys.
///
/// * An answer is correct only when its selected ids form exactly the
///   question's set of correct ids. There is no partial credit.
/// * Answers for unknown questions are kept, marked incorrect, and award 0.
/// * Answers are evaluated in submission order; repeated questions are
///   evaluated independently.
/// * A total that does not fit in an `i32` is rejected with `BadRequest`.
pub fn evaluate(quiz: &Quiz, submitted: &[SubmittedAnswer]) -> Result<Evaluation, AppError> {
    let answers: Vec<AnswerResult> = submitted
        .iter()
        .map(|answer| {
            let (is_correct, score_awarded) = match quiz.question(&answer.question_id) {
                Some(question) => {
                    let correct = is_exact_match(&answer.selected_option_ids, &question.correct_option_ids);
                    (correct, if correct { question.score } else { 0 })
                }
                None => (false, 0),
            };

            AnswerResult {
                question_id: answer.question_id.clone(),
                selected_option_ids: answer.selected_option_ids.clone(),
                is_correct,
                score_awarded,
            }
        })
        .collect();

    let total_score = sum_scores(answers.iter().map(|a| a.score_awarded))?;

    Ok(Evaluation { answers, total_score })
}

/// Adds up scores, failing instead of wrapping on overflow.
pub fn sum_scores(scores: impl IntoIterator<Item = i32>) -> Result<i32, AppError> {
    scores
        .into_iter()
        .try_fold(0i32, |total, score| total.checked_add(score))
        .ok_or(AppError::BadRequest("Total score is too large".to_string()))
}

/// Order-independent set equality of selected and correct option ids.
fn is_exact_match(selected: &[String], correct: &[String]) -> bool {
    let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();
    let correct: HashSet<&str> = correct.iter().map(String::as_str).collect();
    selected == correct
}
