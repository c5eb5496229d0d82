//! GitHub webhook intake.
//!
//! - [`signature`]: HMAC-SHA256 verification of deliveries
//! - [`events`]: typed `pull_request` and `check_run` events parsed from payloads

pub mod events;
pub mod signature;

pub use events::{
    CheckRunAction, CheckRunEvent, ParseError, PrAction, PullRequestEvent, WebhookEvent,
    parse_webhook,
};
pub use signature::{SignatureError, WebhookSecret};
