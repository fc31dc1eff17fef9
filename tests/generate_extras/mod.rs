use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use briefcast::model::{BriefModel, GenerationRequest, ModelError, Segment};

#[macro_export]
macro_rules! assert_briefs {
    (
        $(
            $test_name:ident : segments => $segments:expr, policy => $policy:expr, result => $result:expr
        ),+ $(,)?
    ) => {
        $(
            #[tokio::test]
            async fn $test_name() {
                let model = StubModel::new(vec![Ok($segments)]);
                let config = briefcast::BriefConfig {
                    text_policy: $policy,
                    ..Default::default()
                };
                let context = briefcast::GenerateContext {
                    model: &model,
                    config: &config,
                    retry: briefcast::RetryPolicy::default(),
                };
                let result = briefcast::generate_brief(&context, "2026-10-18 08:30 HKT")
                    .await
                    .expect("Expected successful generation.");

                assert_that(&result).is_equal_to($result);
            }
        )+
    }
}

pub(crate) fn text(value: &str) -> Segment {
    Segment::text(value)
}

/// Answers each call with the next queued result, an empty response once the queue runs dry.
pub(crate) struct StubModel {
    responses: Mutex<VecDeque<Result<Vec<Segment>, ModelError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl StubModel {
    pub fn new(responses: Vec<Result<Vec<Segment>, ModelError>>) -> Self {
        StubModel {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl BriefModel for StubModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Segment>, ModelError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or(Ok(Vec::new()))
    }
}
