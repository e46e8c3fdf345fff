use thiserror::Error;

/// Failure of the language model call behind a reply.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to reach language model: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("language model API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("language model returned no content")]
    EmptyResponse,
}

/// Failure to hand an outbound message to the bus.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmissionError {
    #[error("no subscribers on the {topic} topic")]
    NoSubscribers { topic: &'static str },

    #[error("the {topic} topic is closed")]
    Closed { topic: &'static str },
}
