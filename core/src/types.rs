//! Dashboard DTOs.
//!
//! # Design
//! These mirror the mock-server's schema but are defined independently;
//! the integration tests catch any drift between the two crates.

use serde::{Deserialize, Serialize};

/// A prep course as listed on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Request payload for creating a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCourse {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial update. Omitted fields stay unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCourse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Per-section score for the progress panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionProgress {
    pub section: String,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    pub average_score: f32,
}

/// Dashboard progress summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub study_streak_days: u32,
    pub hours_studied: f32,
    pub practice_tests_taken: u32,
    pub sections: Vec<SectionProgress>,
}

impl ProgressSummary {
    /// Share of all lessons completed, in `0.0..=1.0`.
    pub fn completion(&self) -> f32 {
        let (done, total) = self.sections.iter().fold((0, 0), |(d, t), s| {
            (d + s.completed_lessons, t + s.total_lessons)
        });
        if total == 0 {
            0.0
        } else {
            done as f32 / total as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_course_skips_absent_fields() {
        let body = serde_json::to_value(UpdateCourse {
            title: Some("Organic Chemistry".to_string()),
            description: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"title": "Organic Chemistry"}));
    }

    #[test]
    fn progress_completion() {
        let summary: ProgressSummary = serde_json::from_str(
            r#"{"studyStreakDays":3,"hoursStudied":12.5,"practiceTestsTaken":1,
                "sections":[
                  {"section":"Chem/Phys","completedLessons":3,"totalLessons":10,"averageScore":0.7},
                  {"section":"CARS","completedLessons":1,"totalLessons":10,"averageScore":0.6}
                ]}"#,
        )
        .unwrap();
        assert!((summary.completion() - 0.2).abs() < f32::EPSILON);

        let empty = ProgressSummary { sections: Vec::new(), ..summary };
        assert_eq!(empty.completion(), 0.0);
    }
}
