//! The briefcast library generates a market brief with a web-searching LLM and
//! delivers it to a chat through a bot API.

pub mod config;
pub mod constants;
pub mod deliver;
pub mod generate;
pub mod model;

pub use config::{BriefConfig, PromptConfig, RetryPolicy, TextPolicy, endpoint_url, hkt_timestamp};
pub use deliver::{DeliveryReport, DispatchContext, Formatting, chunk_text, dispatch};
pub use generate::{BriefOutcome, GenerateContext, extract_text, generate_brief};
pub use model::{BriefModel, Segment};
