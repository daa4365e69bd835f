// src/models/statistics.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of scored attempts from one cohort. `year_of_study` is `None`
/// for attempts whose user has no profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortCount {
    pub year_of_study: Option<i32>,
    pub count: i64,
}

/// Represents the 'quiz_statistics' table: the cached aggregate of a
/// quiz's scored attempts. At most one row per quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStatistics {
    pub quiz_id: i64,
    pub total_attempts: i64,
    pub average_score: f64,
    pub highest_score: i32,
    pub lowest_score: i32,
    pub attempts_by_year: Vec<CohortCount>,
    pub last_updated: DateTime<Utc>,
}

/// `?refresh=true` forces a rebuild; any other value reads the cache.
#[derive(Debug, Deserialize)]
pub struct StatisticsParams {
    pub refresh: Option<String>,
}

impl StatisticsParams {
    pub fn force_refresh(&self) -> bool {
        self.refresh.as_deref() == Some("true")
    }
}
