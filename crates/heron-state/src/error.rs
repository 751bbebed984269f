#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Layout(#[from] heron::Error),

    #[error("transition {transition} references unknown state {state}")]
    UnknownState { transition: String, state: String },

    #[error("duplicate state id: {id}")]
    DuplicateState { id: String },

    #[error("failed to decode layout configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid layout configuration ({field}): {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("no diagram element with id {id}")]
    UnknownElement { id: String },

    #[error("element {id} has invalid size {width}x{height}")]
    InvalidSize { id: String, width: f64, height: f64 },

    #[error("cannot move element {id} to non-finite position ({x}, {y})")]
    NonFinitePosition { id: String, x: f64, y: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
