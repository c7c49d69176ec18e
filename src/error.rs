use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompsAiError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("No API key configured. Run `comps-ai config --add-key YOUR_KEY` or set GEMINI_API_KEY")]
    MissingApiKey,

    #[error("Target company description is empty")]
    EmptyTarget,

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Missing required columns: {0}")]
    MissingColumns(String),

    #[error("Excel read error: {0}")]
    ExcelRead(String),

    #[error("Excel generation error: {0}")]
    ExcelGeneration(String),

    #[error("CSV export error: {0}")]
    CsvExport(String),

    #[error("API call error: {0}")]
    ApiCall(String),

    #[error("Failed to parse API response: {0}")]
    ApiParse(String),

    #[error("Model self-test failed: {0}")]
    SelfTest(String),

    #[error("Failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: usize, last_error: String },

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] comps_ai_common::Error),
}

pub type Result<T> = std::result::Result<T, CompsAiError>;
