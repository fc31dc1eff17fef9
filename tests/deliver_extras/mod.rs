use std::sync::Mutex;

use async_trait::async_trait;
use briefcast::Formatting;
use briefcast::deliver::{DeliveryError, MessageSender};

#[macro_export]
macro_rules! assert_chunk_counts {
    (
        $(
            $test_name:ident : length => $length:expr, calls => $calls:expr
        ),+ $(,)?
    ) => {
        $(
            #[tokio::test]
            async fn $test_name() {
                let text: String = "abcdefghij".chars().cycle().take($length).collect();
                let sender = StubSender::accepting();
                let context = briefcast::DispatchContext {
                    sender: &sender,
                    chat_id: "42",
                    formatting: briefcast::Formatting::RichText,
                };
                let report = briefcast::dispatch(&context, &text).await;

                assert_that(&sender.calls()).has_length($calls);
                assert_that(&report.delivered).is_equal_to($calls);
                assert_that(&sender.texts().concat()).is_equal_to(text);
            }
        )+
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct SentMessage {
    pub chat_id: String,
    pub text: String,
    pub formatting: Formatting,
}

type Responder = Box<dyn Fn(usize, Formatting) -> Result<(), DeliveryError> + Send + Sync>;

/// Records every call and answers it with `responder(call_index, formatting)`.
pub(crate) struct StubSender {
    responder: Responder,
    calls: Mutex<Vec<SentMessage>>,
}

impl StubSender {
    pub fn new(
        responder: impl Fn(usize, Formatting) -> Result<(), DeliveryError> + Send + Sync + 'static,
    ) -> Self {
        StubSender {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(|_, _| Ok(()))
    }

    pub fn calls(&self) -> Vec<SentMessage> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.text).collect()
    }
}

pub(crate) fn rejected() -> DeliveryError {
    DeliveryError::Rejected {
        status: 400,
        message: "Bad Request: can't parse entities".to_owned(),
    }
}

#[async_trait]
impl MessageSender for StubSender {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        formatting: Formatting,
    ) -> Result<(), DeliveryError> {
        let index = {
            let mut calls = self.calls.lock().expect("calls lock");
            calls.push(SentMessage {
                chat_id: chat_id.to_owned(),
                text: text.to_owned(),
                formatting,
            });
            calls.len() - 1
        };
        (self.responder)(index, formatting)
    }
}
