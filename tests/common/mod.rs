// tests/common/mod.rs

#![allow(dead_code)]

use quiz_backend::{
    config::Config,
    models::user::{NewUser, Role},
    repositories::{Store, memory::MemoryStore},
    routes,
    state::AppState,
    utils::hash::hash_password,
};
use serde_json::{Value, json};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub struct TestApp {
    pub address: String,
    pub store: Store,
    pub client: reqwest::Client,
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        db_max_connections: 1,
        admin_email: None,
        admin_password: None,
    }
}

/// Spawns the app on a random port, backed by an in-memory store that
/// already holds one admin account.
pub async fn spawn_app() -> TestApp {
    let store = Store::from_backend(MemoryStore::new());

    store
        .users
        .create_user(NewUser {
            email: ADMIN_EMAIL.to_string(),
            password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
            role: Role::Admin,
            is_approved: None,
        })
        .await
        .unwrap();

    let app = routes::create_router(AppState {
        store: store.clone(),
        config: test_config(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, email: &str, role: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "email": email, "password": "password123", "role": role }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200, "login failed for {}", email);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Registers a user with `role` and returns `(user_id, token)`.
    pub async fn signup(&self, email: &str, role: &str) -> (i64, String) {
        let response = self.register(email, role).await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        let user_id = body["userId"].as_i64().unwrap();
        (user_id, self.login(email, "password123").await)
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn save_profile(&self, token: &str, year_of_study: i32, roll_number: &str) {
        let response = self
            .client
            .put(self.url("/api/users/profile"))
            .bearer_auth(token)
            .json(&json!({
                "firstName": "Test",
                "lastName": roll_number,
                "yearOfStudy": year_of_study,
                "department": "Computer Science",
                "rollNumber": roll_number,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Quiz body with one 10-point question whose only correct option is "A"
/// and one 5-point question with correct options "A" and "C".
pub fn quiz_body(year_of_study: i32, start: chrono::DateTime<chrono::Utc>, end: chrono::DateTime<chrono::Utc>) -> Value {
    json!({
        "title": "Rust Basics",
        "description": "Ownership and borrowing",
        "yearOfStudy": year_of_study,
        "startTime": start,
        "endTime": end,
        "duration": 30,
        "questions": [
            {
                "questionId": "q1",
                "text": "Which keyword declares an immutable binding?",
                "score": 10,
                "options": [
                    { "optionId": "A", "text": "let", "isCorrect": true },
                    { "optionId": "B", "text": "mut", "isCorrect": false }
                ]
            },
            {
                "questionId": "q2",
                "text": "Which types are Copy?",
                "score": 5,
                "options": [
                    { "optionId": "A", "text": "u8", "isCorrect": true },
                    { "optionId": "B", "text": "Vec<u8>", "isCorrect": false },
                    { "optionId": "C", "text": "char", "isCorrect": true }
                ]
            }
        ]
    })
}
