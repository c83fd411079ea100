//! Typed dashboard endpoints on top of `ApiClient`.

use crate::client::ApiClient;
use crate::envelope::Envelope;
use crate::types::{Course, CreateCourse, ProgressSummary, UpdateCourse};

/// Course and progress calls used by the learner dashboard.
#[derive(Debug, Clone)]
pub struct DashboardApi {
    client: ApiClient,
}

impl DashboardApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn list_courses(&self) -> Envelope<Vec<Course>> {
        self.client.get("/courses").await
    }

    pub async fn get_course(&self, id: u64) -> Envelope<Course> {
        self.client.get(&format!("/courses/{id}")).await
    }

    pub async fn create_course(&self, input: &CreateCourse) -> Envelope<Course> {
        self.client.post("/courses", input).await
    }

    /// Full replacement of title and description.
    pub async fn replace_course(&self, id: u64, input: &CreateCourse) -> Envelope<Course> {
        self.client.put(&format!("/courses/{id}"), input).await
    }

    pub async fn update_course(&self, id: u64, input: &UpdateCourse) -> Envelope<Course> {
        self.client.patch(&format!("/courses/{id}"), input).await
    }

    pub async fn delete_course(&self, id: u64) -> Envelope<()> {
        self.client.delete(&format!("/courses/{id}")).await
    }

    pub async fn progress(&self) -> Envelope<ProgressSummary> {
        self.client.get("/progress").await
    }
}
