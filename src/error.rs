use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to decode image: {0}")]
    InputDecode(String),

    #[error("table detection failed: {0}")]
    Detector(String),

    #[error("text recognition failed: {0}")]
    Recognizer(String),

    #[error("malformed fragment {text:?}: {reason}")]
    MalformedFragment { text: String, reason: &'static str },
}
