// tests/quiz_flow_tests.rs

mod common;

use chrono::{Duration, Utc};
use common::{TestApp, quiz_body, spawn_app};
use quiz_backend::{
    models::{
        attempt::{NewAttempt, SubmittedAnswer},
        quiz::QuizPayload,
    },
    services::{quiz_service, scoring},
};
use serde_json::{Value, json};

/// Instructor and year-2 student, plus an open quiz for year 2.
async fn open_quiz(app: &TestApp) -> (String, String, i64) {
    let (_, instructor) = app.signup("prof@example.com", "Instructor").await;
    let (_, student) = app.signup("stud@example.com", "Student").await;
    app.save_profile(&student, 2, "USN100").await;

    let now = Utc::now();
    let response = app
        .post(
            "/api/quizzes",
            &instructor,
            &quiz_body(2, now - Duration::minutes(5), now + Duration::hours(1)),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    let quiz_id = body["quizId"].as_i64().unwrap();

    (instructor, student, quiz_id)
}

/// Stores a quiz whose window has already closed, with one scored attempt
/// by `student_id` that picked "A" on q1 only.
async fn closed_quiz_with_attempt(app: &TestApp, instructor_id: i64, student_id: i64) -> i64 {
    let now = Utc::now();
    let payload: QuizPayload = serde_json::from_value(quiz_body(
        2,
        now - Duration::hours(2),
        now - Duration::hours(1),
    ))
    .unwrap();
    let draft = quiz_service::normalize_quiz(payload).unwrap();
    let quiz = app.store.quizzes.create_quiz(instructor_id, draft).await.unwrap();

    let evaluation = scoring::evaluate(
        &quiz,
        &[SubmittedAnswer {
            question_id: "q1".to_string(),
            selected_option_ids: vec!["A".to_string()],
        }],
    )
    .unwrap();
    app.store
        .attempts
        .insert_attempt(NewAttempt {
            quiz_id: quiz.id,
            user_id: student_id,
            submitted_at: now - Duration::minutes(90),
            is_scored: true,
            answers: evaluation.answers,
            total_score: evaluation.total_score,
        })
        .await
        .unwrap();

    quiz.id
}

#[tokio::test]
async fn create_quiz_derives_total_and_correct_ids() {
    let app = spawn_app().await;
    let (instructor, _, quiz_id) = open_quiz(&app).await;

    let body: Value = app
        .get(&format!("/api/quizzes/{}/edit", quiz_id), &instructor)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body["totalScore"], 15);
    assert_eq!(body["questions"][0]["correctOptionIds"], json!(["A"]));
    assert_eq!(body["questions"][1]["correctOptionIds"], json!(["A", "C"]));
    assert_eq!(body["questions"][0]["options"][0]["isCorrect"], true);
}

#[tokio::test]
async fn create_quiz_rejects_inverted_window_and_students() {
    let app = spawn_app().await;
    let (instructor, student, _) = open_quiz(&app).await;
    let now = Utc::now();

    let response = app
        .post("/api/quizzes", &instructor, &quiz_body(2, now, now - Duration::minutes(1)))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .post("/api/quizzes", &student, &quiz_body(2, now, now + Duration::hours(1)))
        .await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn student_view_hides_correct_answers() {
    let app = spawn_app().await;
    let (_, student, quiz_id) = open_quiz(&app).await;

    let response = app.get(&format!("/api/quizzes/{}", quiz_id), &student).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["questions"].as_array().unwrap().len(), 2);
    let raw = body.to_string();
    assert!(!raw.contains("isCorrect"));
    assert!(!raw.contains("correctOptionIds"));
}

#[tokio::test]
async fn student_from_other_cohort_is_forbidden() {
    let app = spawn_app().await;
    let (_, _, quiz_id) = open_quiz(&app).await;
    let (_, other) = app.signup("other@example.com", "Student").await;
    app.save_profile(&other, 4, "USN400").await;

    let response = app.get(&format!("/api/quizzes/{}", quiz_id), &other).await;
    assert_eq!(response.status().as_u16(), 403);

    let (_, no_profile) = app.signup("noprofile@example.com", "Student").await;
    let response = app.get(&format!("/api/quizzes/{}", quiz_id), &no_profile).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn attempt_is_scored_once() {
    let app = spawn_app().await;
    let (_, student, quiz_id) = open_quiz(&app).await;
    let path = format!("/api/quizzes/{}/attempt", quiz_id);

    let answers = json!({
        "answers": [
            { "questionId": "q1", "selectedOptionIds": ["A"] },
            { "questionId": "q2", "selectedOptionIds": ["C", "A"] },
            { "questionId": "ghost", "selectedOptionIds": ["A"] }
        ]
    });
    let response = app.post(&path, &student, &answers).await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["quizId"], quiz_id);
    assert_eq!(body["totalScore"], 15);
    assert_eq!(body["isScored"], true);

    let response = app.post(&path, &student, &answers).await;
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Quiz already attempted");
}

#[tokio::test]
async fn partial_selection_scores_zero() {
    let app = spawn_app().await;
    let (_, student, quiz_id) = open_quiz(&app).await;

    let response = app
        .post(
            &format!("/api/quizzes/{}/attempt", quiz_id),
            &student,
            &json!({
                "answers": [
                    { "questionId": "q1", "selectedOptionIds": ["A", "B"] },
                    { "questionId": "q2", "selectedOptionIds": ["A"] }
                ]
            }),
        )
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["totalScore"], 0);
}

#[tokio::test]
async fn attempt_outside_window_is_rejected() {
    let app = spawn_app().await;
    let (instructor, student) = (
        app.signup("prof@example.com", "Instructor").await.1,
        app.signup("stud@example.com", "Student").await.1,
    );
    let now = Utc::now();
    let body: Value = app
        .post(
            "/api/quizzes",
            &instructor,
            &quiz_body(2, now + Duration::hours(1), now + Duration::hours(2)),
        )
        .await
        .json()
        .await
        .unwrap();

    let response = app
        .post(
            &format!("/api/quizzes/{}/attempt", body["quizId"]),
            &student,
            &json!({ "answers": [] }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Quiz is not available");

    let response = app
        .post("/api/quizzes/999999/attempt", &student, &json!({ "answers": [] }))
        .await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn results_wait_for_quiz_end() {
    let app = spawn_app().await;
    let (_, student, quiz_id) = open_quiz(&app).await;
    app.post(
        &format!("/api/quizzes/{}/attempt", quiz_id),
        &student,
        &json!({ "answers": [{ "questionId": "q1", "selectedOptionIds": ["A"] }] }),
    )
    .await;

    let response = app.get(&format!("/api/quizzes/{}/results", quiz_id), &student).await;
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Results not available until quiz ends");
}

#[tokio::test]
async fn results_after_end_include_correct_answers() {
    let app = spawn_app().await;
    let (instructor_id, _) = app.signup("prof@example.com", "Instructor").await;
    let (student_id, student) = app.signup("stud@example.com", "Student").await;
    let quiz_id = closed_quiz_with_attempt(&app, instructor_id, student_id).await;

    let response = app.get(&format!("/api/quizzes/{}/results", quiz_id), &student).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["attempt"]["totalScore"], 10);
    assert_eq!(body["attempt"]["answers"][0]["isCorrect"], true);
    assert_eq!(body["quiz"]["questions"][1]["correctOptionIds"], json!(["A", "C"]));

    let (_, stranger) = app.signup("late@example.com", "Student").await;
    let response = app.get(&format!("/api/quizzes/{}/results", quiz_id), &stranger).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn started_quiz_cannot_be_changed() {
    let app = spawn_app().await;
    let (instructor, _, quiz_id) = open_quiz(&app).await;
    let path = format!("/api/quizzes/{}", quiz_id);
    let now = Utc::now();

    let response = app
        .put(&path, &instructor, &quiz_body(2, now + Duration::hours(1), now + Duration::hours(2)))
        .await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Cannot update quiz after start time");

    let response = app.delete(&path, &instructor).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Cannot delete quiz after start time");
}

#[tokio::test]
async fn upcoming_quiz_can_be_updated_and_deleted_by_owner() {
    let app = spawn_app().await;
    let (_, instructor) = app.signup("prof@example.com", "Instructor").await;
    let (_, rival) = app.signup("rival@example.com", "Instructor").await;
    let now = Utc::now();
    let start = now + Duration::hours(1);
    let end = now + Duration::hours(2);

    let body: Value = app
        .post("/api/quizzes", &instructor, &quiz_body(3, start, end))
        .await
        .json()
        .await
        .unwrap();
    let path = format!("/api/quizzes/{}", body["quizId"]);

    let mut changed = quiz_body(3, start, end);
    changed["title"] = json!("Rust Basics v2");
    changed["questions"][0]["score"] = json!(20);

    let response = app.put(&path, &rival, &changed).await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app.put(&path, &instructor, &changed).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["title"], "Rust Basics v2");

    let edit: Value = app
        .get(&format!("{}/edit", path), &instructor)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(edit["totalScore"], 25);

    let response = app.delete(&path, &instructor).await;
    assert_eq!(response.status().as_u16(), 200);
    let response = app.get(&format!("{}/edit", path), &instructor).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn statistics_are_cached_until_refresh() {
    let app = spawn_app().await;
    let (instructor, student, quiz_id) = open_quiz(&app).await;
    let stats_path = format!("/api/quizzes/{}/statistics", quiz_id);

    let empty: Value = app.get(&stats_path, &instructor).await.json().await.unwrap();
    assert_eq!(empty["totalAttempts"], 0);
    assert_eq!(empty["averageScore"], 0.0);
    assert_eq!(empty["highestScore"], 0);
    assert_eq!(empty["lowestScore"], 0);
    assert_eq!(empty["attemptsByYear"], json!([]));

    app.post(
        &format!("/api/quizzes/{}/attempt", quiz_id),
        &student,
        &json!({ "answers": [{ "questionId": "q1", "selectedOptionIds": ["A"] }] }),
    )
    .await;

    let stale: Value = app.get(&stats_path, &instructor).await.json().await.unwrap();
    assert_eq!(stale, empty);

    let response = app.get(&format!("{}?refresh=1", stats_path), &instructor).await;
    assert_eq!(response.status().as_u16(), 200);
    let stale: Value = response.json().await.unwrap();
    assert_eq!(stale, empty);

    let fresh: Value = app
        .get(&format!("{}?refresh=true", stats_path), &instructor)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(fresh["totalAttempts"], 1);
    assert_eq!(fresh["averageScore"], 10.0);
    assert_eq!(fresh["attemptsByYear"], json!([{ "yearOfStudy": 2, "count": 1 }]));

    let again: Value = app.get(&stats_path, &instructor).await.json().await.unwrap();
    assert_eq!(again, fresh);
}

#[tokio::test]
async fn statistics_and_results_are_owner_only() {
    let app = spawn_app().await;
    let (_, _, quiz_id) = open_quiz(&app).await;
    let (_, rival) = app.signup("rival@example.com", "Instructor").await;

    for suffix in ["statistics", "resultsForInstructor", "edit"] {
        let response = app.get(&format!("/api/quizzes/{}/{}", quiz_id, suffix), &rival).await;
        assert_eq!(response.status().as_u16(), 403, "{} must be owner only", suffix);
    }
}

#[tokio::test]
async fn instructor_results_fall_back_without_profile() {
    let app = spawn_app().await;
    let (instructor, student, quiz_id) = open_quiz(&app).await;
    let (_, anonymous) = app.signup("anon@example.com", "Student").await;

    for token in [&student, &anonymous] {
        let response = app
            .post(
                &format!("/api/quizzes/{}/attempt", quiz_id),
                token,
                &json!({ "answers": [{ "questionId": "q1", "selectedOptionIds": ["A"] }] }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
    }

    let rows: Vec<Value> = app
        .get(&format!("/api/quizzes/{}/resultsForInstructor", quiz_id), &instructor)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let with_profile = rows.iter().find(|r| r["usn"] == "USN100").unwrap();
    assert_eq!(with_profile["studentName"], "Test USN100");
    assert_eq!(with_profile["yearOfStudy"], 2);
    assert_eq!(with_profile["score"], 10);

    let without = rows.iter().find(|r| r["usn"] == "N/A").unwrap();
    assert_eq!(without["studentName"], "N/A");
    assert_eq!(without["yearOfStudy"], "N/A");
}

#[tokio::test]
async fn listings_filter_by_status() {
    let app = spawn_app().await;
    let (instructor, student, _) = open_quiz(&app).await;
    let now = Utc::now();
    app.post(
        "/api/quizzes",
        &instructor,
        &quiz_body(2, now + Duration::days(1), now + Duration::days(2)),
    )
    .await;

    let active: Vec<Value> = app.get("/api/quizzes", &student).await.json().await.unwrap();
    assert_eq!(active.len(), 1);
    let upcoming: Vec<Value> = app
        .get("/api/quizzes?status=upcoming", &student)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(upcoming.len(), 1);
    let past: Vec<Value> = app.get("/api/quizzes?status=past", &student).await.json().await.unwrap();
    assert!(past.is_empty());

    let all: Vec<Value> = app.get("/api/instructors/quizzes", &instructor).await.json().await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|q| q["totalAttempts"] == 0));
    let active: Vec<Value> = app
        .get("/api/instructors/quizzes?status=active", &instructor)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn dashboards_summarize_activity() {
    let app = spawn_app().await;
    let (instructor, student, quiz_id) = open_quiz(&app).await;
    app.post(
        &format!("/api/quizzes/{}/attempt", quiz_id),
        &student,
        &json!({ "answers": [{ "questionId": "q1", "selectedOptionIds": ["A"] }] }),
    )
    .await;

    let dashboard: Value = app.get("/api/students/dashboard", &student).await.json().await.unwrap();
    assert_eq!(dashboard["completedQuizzes"][0]["quizId"], quiz_id);
    assert_eq!(dashboard["completedQuizzes"][0]["title"], "Rust Basics");
    assert_eq!(dashboard["activeQuizzes"].as_array().unwrap().len(), 1);
    assert_eq!(dashboard["averageScore"], 10.0);

    app.get(&format!("/api/quizzes/{}/statistics", quiz_id), &instructor).await;
    let dashboard: Value = app
        .get("/api/instructors/dashboard", &instructor)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(dashboard["totalQuizzes"], 1);
    assert_eq!(dashboard["activeQuizzes"].as_array().unwrap().len(), 1);
    assert_eq!(dashboard["averageAttemptsPerQuiz"], 1.0);
    assert_eq!(dashboard["averageScoreAcrossQuizzes"], 10.0);

    let response = app.get("/api/students/dashboard", &instructor).await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn malformed_path_and_query_get_json_errors() {
    let app = spawn_app().await;
    let (instructor, student, _) = open_quiz(&app).await;

    for (path, token) in [
        ("/api/quizzes/abc/statistics", &instructor),
        ("/api/quizzes/abc", &student),
        ("/api/quizzes?status=someday", &student),
        ("/api/instructors/quizzes?status=someday", &instructor),
    ] {
        let response = app.get(path, token).await;
        assert_eq!(response.status().as_u16(), 400, "{} must be rejected", path);
        let body: Value = response.json().await.unwrap();
        assert!(body["message"].is_string(), "{} must carry a message", path);
    }
}
