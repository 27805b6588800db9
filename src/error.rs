use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemovalError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Salesforce login failed: {0}")]
    Auth(String),

    #[error("Salesforce API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{pipeline} pipeline stopped before {stage}: {source}")]
    Stage {
        pipeline: &'static str,
        stage: crate::pipeline::PipelineStage,
        #[source]
        source: Box<RemovalError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<config::ConfigError> for RemovalError {
    fn from(e: config::ConfigError) -> Self {
        RemovalError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RemovalError>;
