//! Transport double for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::error::ApiError;
use super::transport::{Transport, TransportResponse};

/// One request seen by the mock.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub bearer: String,
}

impl RecordedRequest {
    pub(crate) fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

type Responder = Box<dyn Fn(&RecordedRequest) -> Result<TransportResponse, ApiError> + Send + Sync>;

/// Answers requests from a closure, recording each one.
pub(crate) struct MockTransport {
    responder: Responder,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub(crate) fn new(
        responder: impl Fn(&RecordedRequest) -> Result<TransportResponse, ApiError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replay `responses` in order; further requests get a 500.
    pub(crate) fn scripted(responses: Vec<TransportResponse>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::new(move |_| {
            Ok(queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| TransportResponse::new(500, "script exhausted")))
        })
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        bearer: &str,
    ) -> Result<TransportResponse, ApiError> {
        let request = RecordedRequest {
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            bearer: bearer.to_string(),
        };
        let response = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}
