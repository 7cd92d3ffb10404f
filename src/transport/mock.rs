//! Scripted doubles for the transport and sleeper seams.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use parking_lot::Mutex;

use super::client::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use super::sleeper::Sleeper;

#[derive(Debug, Clone)]
enum Outcome {
    Respond(StatusCode, Bytes),
    Fail,
}

impl Outcome {
    fn materialize(&self) -> Result<HttpResponse, TransportError> {
        match self {
            Outcome::Respond(status, body) => Ok(HttpResponse {
                status: *status,
                body: body.clone(),
            }),
            Outcome::Fail => Err(TransportError::Connect("scripted failure".to_string())),
        }
    }
}

#[derive(Default)]
struct Route {
    queued: VecDeque<Outcome>,
    sticky: Option<Outcome>,
}

/// Answers POSTs per URL: queued one-shot outcomes first, then the sticky
/// outcome, otherwise a connection error. Every request is recorded.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: serde_json::Value) -> &Self {
        self.push(url, Outcome::Respond(status_code(status), Bytes::from(body.to_string())));
        self
    }

    pub fn respond_raw(&self, url: &str, status: u16, body: &str) -> &Self {
        self.push(url, Outcome::Respond(status_code(status), Bytes::from(body.to_string())));
        self
    }

    pub fn fail(&self, url: &str) -> &Self {
        self.push(url, Outcome::Fail);
        self
    }

    pub fn always(&self, url: &str, status: u16, body: serde_json::Value) -> &Self {
        let outcome = Outcome::Respond(status_code(status), Bytes::from(body.to_string()));
        self.routes.lock().entry(url.to_string()).or_default().sticky = Some(outcome);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, url: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url == url)
            .cloned()
            .collect()
    }

    fn push(&self, url: &str, outcome: Outcome) {
        self.routes
            .lock()
            .entry(url.to_string())
            .or_default()
            .queued
            .push_back(outcome);
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap()
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().push(request);

        let mut routes = self.routes.lock();
        let Some(route) = routes.get_mut(&url) else {
            return Err(TransportError::Connect(format!("no route for {}", url)));
        };
        match route.queued.pop_front().or_else(|| route.sticky.clone()) {
            Some(outcome) => outcome.materialize(),
            None => Err(TransportError::Connect(format!("no response scripted for {}", url))),
        }
    }
}

/// Records requested delays and returns immediately.
///
/// With a limit set, every sleep past the limit is recorded and then never
/// completes, which parks a forever loop at a known point.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
    limit: Option<usize>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parking_after(limit: usize) -> Self {
        Self {
            slept: Mutex::new(Vec::new()),
            limit: Some(limit),
        }
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        let count = {
            let mut slept = self.slept.lock();
            slept.push(duration);
            slept.len()
        };
        if self.limit.is_some_and(|limit| count > limit) {
            std::future::pending::<()>().await;
        }
    }
}
