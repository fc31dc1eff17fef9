use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use url::Url;

#[derive(Clone, Debug)]
pub(crate) struct RecordedRequest {
    pub path: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

struct ServerState {
    responses: Mutex<VecDeque<(StatusCode, String)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Local HTTP server answering every request with the next queued response,
/// `200 {}` once the queue runs dry.
pub(crate) struct MockServer {
    base: Url,
    state: Arc<ServerState>,
}

impl MockServer {
    pub async fn start(responses: Vec<(StatusCode, &str)>) -> Self {
        let state = Arc::new(ServerState {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|(status, body)| (status, body.to_owned()))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .fallback(record)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        tokio::spawn(async move { axum::serve(listener, app).await });

        MockServer {
            base: Url::parse(&format!("http://{addr}")).expect("mock server url"),
            state,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().expect("requests lock").clone()
    }
}

async fn record(
    State(state): State<Arc<ServerState>>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    state
        .requests
        .lock()
        .expect("requests lock")
        .push(RecordedRequest {
            path: uri.path().to_owned(),
            headers,
            body: serde_json::from_str(&body).unwrap_or(serde_json::Value::Null),
        });
    state
        .responses
        .lock()
        .expect("responses lock")
        .pop_front()
        .unwrap_or((StatusCode::OK, "{}".to_owned()))
}
