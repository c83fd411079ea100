//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::http::{HttpRequest, HttpResponse, Transport};

type Step = (Duration, Result<HttpResponse, FetchError>);

/// Replays queued responses in call order, each after its own delay, and
/// records every request it sees.
#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, delay_ms: u64, status: u16, body: &str) -> Self {
        self.steps.lock().unwrap().push_back((
            Duration::from_millis(delay_ms),
            Ok(response(status, body)),
        ));
        self
    }

    pub fn fail(self, delay_ms: u64, error: FetchError) -> Self {
        self.steps
            .lock()
            .unwrap()
            .push_back((Duration::from_millis(delay_ms), Err(error)));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        self.seen.lock().unwrap().push(request);
        let step = self.steps.lock().unwrap().pop_front();
        let (delay, result) = step.expect("scripted transport ran out of responses");
        tokio::time::sleep(delay).await;
        result
    }
}

pub fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        status_text: reason(status).to_string(),
        headers: Vec::new(),
        body: body.to_string(),
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}
