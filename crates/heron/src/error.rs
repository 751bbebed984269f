#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("edge {edge} references a missing node: {node}")]
    MissingEndpoint { edge: String, node: String },

    #[error("duplicate node id: {id}")]
    DuplicateNode { id: String },

    #[error("invalid physics configuration ({field}): {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
