use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCourse {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCourse {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct SlowParams {
    #[serde(default)]
    pub ms: u64,
}

#[derive(Default)]
pub struct Db {
    courses: BTreeMap<u64, Course>,
    next_id: u64,
}

impl Db {
    fn insert(&mut self, title: String, description: Option<String>) -> Course {
        self.next_id += 1;
        let course = Course {
            id: self.next_id,
            title,
            description,
        };
        self.courses.insert(course.id, course.clone());
        course
    }
}

pub type SharedDb = Arc<RwLock<Db>>;

/// JSON error body in the `{message}` shape clients expect.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Course not found".to_string(),
        }
    }

    fn invalid(message: &str) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

/// Router with an empty course catalogue.
pub fn app() -> Router {
    app_with(Vec::new())
}

/// Router seeded with `courses`; ids are assigned sequentially from 1.
pub fn app_with(courses: Vec<CreateCourse>) -> Router {
    let mut db = Db::default();
    for course in courses {
        db.insert(course.title, course.description);
    }
    let db: SharedDb = Arc::new(RwLock::new(db));

    let api = Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(get_course)
                .put(replace_course)
                .patch(update_course)
                .delete(delete_course),
        )
        .route("/progress", get(progress))
        .route("/broken", get(broken))
        .route("/slow", get(slow))
        .route("/echo", any(echo))
        .with_state(db);

    Router::new().nest("/api", api)
}

/// Mock catalogue served by the binary.
pub fn demo_courses() -> Vec<CreateCourse> {
    [
        ("Biological and Biochemical Foundations", "Bio/Biochem content review"),
        ("Chemical and Physical Foundations", "Chem/Phys content review"),
        ("Psychological, Social, and Biological Foundations", "Psych/Soc content review"),
        ("Critical Analysis and Reasoning Skills", "CARS passage strategy"),
    ]
    .into_iter()
    .map(|(title, description)| CreateCourse {
        title: title.to_string(),
        description: Some(description.to_string()),
    })
    .collect()
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_app(listener, app()).await
}

pub async fn run_app(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

async fn list_courses(State(db): State<SharedDb>) -> Json<Vec<Course>> {
    let db = db.read().await;
    Json(db.courses.values().cloned().collect())
}

async fn create_course(
    State(db): State<SharedDb>,
    Json(input): Json<CreateCourse>,
) -> Result<(StatusCode, Json<Course>), ApiError> {
    if input.title.trim().is_empty() {
        return Err(ApiError::invalid("Title is required"));
    }
    let course = db.write().await.insert(input.title, input.description);
    debug!(id = course.id, "course created");
    Ok((StatusCode::CREATED, Json(course)))
}

async fn get_course(State(db): State<SharedDb>, Path(id): Path<u64>) -> Result<Json<Course>, ApiError> {
    let db = db.read().await;
    db.courses.get(&id).cloned().map(Json).ok_or_else(ApiError::not_found)
}

async fn replace_course(
    State(db): State<SharedDb>,
    Path(id): Path<u64>,
    Json(input): Json<CreateCourse>,
) -> Result<Json<Course>, ApiError> {
    let mut db = db.write().await;
    let course = db.courses.get_mut(&id).ok_or_else(ApiError::not_found)?;
    course.title = input.title;
    course.description = input.description;
    Ok(Json(course.clone()))
}

async fn update_course(
    State(db): State<SharedDb>,
    Path(id): Path<u64>,
    Json(input): Json<UpdateCourse>,
) -> Result<Json<Course>, ApiError> {
    let mut db = db.write().await;
    let course = db.courses.get_mut(&id).ok_or_else(ApiError::not_found)?;
    if let Some(title) = input.title {
        course.title = title;
    }
    if let Some(description) = input.description {
        course.description = Some(description);
    }
    Ok(Json(course.clone()))
}

async fn delete_course(State(db): State<SharedDb>, Path(id): Path<u64>) -> Result<StatusCode, ApiError> {
    let mut db = db.write().await;
    db.courses
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(ApiError::not_found)
}

async fn progress() -> Json<serde_json::Value> {
    Json(json!({
        "studyStreakDays": 6,
        "hoursStudied": 42.5,
        "practiceTestsTaken": 2,
        "sections": [
            {"section": "Bio/Biochem", "completedLessons": 18, "totalLessons": 40, "averageScore": 0.74},
            {"section": "Chem/Phys", "completedLessons": 12, "totalLessons": 36, "averageScore": 0.68},
            {"section": "Psych/Soc", "completedLessons": 20, "totalLessons": 30, "averageScore": 0.81},
            {"section": "CARS", "completedLessons": 9, "totalLessons": 24, "averageScore": 0.63}
        ]
    }))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "<html>upstream exploded</html>")
}

async fn slow(Query(params): Query<SlowParams>) -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    Json(json!({ "slept_ms": params.ms }))
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<serde_json::Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    Json(json!({
        "method": method.as_str(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_omits_missing_description() {
        let course = Course {
            id: 42,
            title: "Algebra".to_string(),
            description: None,
        };
        let json = serde_json::to_value(&course).unwrap();
        assert_eq!(json, json!({"id": 42, "title": "Algebra"}));
    }

    #[test]
    fn create_course_description_optional() {
        let input: CreateCourse = serde_json::from_str(r#"{"title":"CARS"}"#).unwrap();
        assert_eq!(input.title, "CARS");
        assert!(input.description.is_none());
    }

    #[test]
    fn create_course_rejects_missing_title() {
        let result: Result<CreateCourse, _> = serde_json::from_str(r#"{"description":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn db_assigns_sequential_ids() {
        let mut db = Db::default();
        assert_eq!(db.insert("A".to_string(), None).id, 1);
        assert_eq!(db.insert("B".to_string(), None).id, 2);
    }

    #[test]
    fn update_course_all_fields_optional() {
        let input: UpdateCourse = serde_json::from_str("{}").unwrap();
        assert!(input.title.is_none());
        assert!(input.description.is_none());
    }
}
