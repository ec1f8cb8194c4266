use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpruceError {
    #[error("cannot reach or authenticate to {server}: {reason}")]
    Connection { server: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("malformed removal document: {0}")]
    MalformedRemovals(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("User input error: {0}")]
    Input(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<dialoguer::Error> for SpruceError {
    fn from(err: dialoguer::Error) -> Self {
        SpruceError::Input(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SpruceError>;
