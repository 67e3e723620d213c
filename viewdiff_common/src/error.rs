use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewDiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// A link was looked up by name but carries no `name` attribute
    #[error("Link without a 'name' attribute on node '{node}'")]
    MissingLinkName { node: String },

    #[error("Content error: {0}")]
    Content(String),

    #[error("Resource error: {0}")]
    Resource(String),
}

pub type Result<T> = std::result::Result<T, ViewDiffError>;
