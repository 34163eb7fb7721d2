use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseCodeError {
    #[error("unknown stage `{0}` (expected KG, PRIMARY, PREP or SECONDARY)")]
    Stage(String),
    #[error("unknown status `{0}` (expected PASS, RETAKE or FAIL)")]
    Status(String),
}

/// Failures while moving a roster in or out of a sheet.
#[derive(Debug, Error)]
pub enum SheetError {
    /// The sheet could not be tokenized at all. Nothing was applied.
    #[error("import sheet could not be parsed: {0}")]
    ImportParse(#[source] csv::Error),
    #[error("failed to write export row: {0}")]
    ExportWrite(#[source] csv::Error),
    #[error("failed to write export sheet: {0}")]
    ExportIo(#[from] std::io::Error),
}

/// Why a single import row was skipped. The rest of the sheet still applies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("row {row}: unknown stage `{value}`")]
    UnknownStage { row: usize, value: String },
    #[error("row {row}: new student `{key}` has no name")]
    MissingName { row: usize, key: String },
    #[error("row {row}: new student `{name}` has no stage")]
    MissingStage { row: usize, name: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read grading config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid grading config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("grading config lists no subjects")]
    NoSubjects,
    #[error("grading config contains an empty subject name")]
    EmptySubject,
    #[error("subject `{0}` is listed more than once")]
    DuplicateSubject(String),
    #[error("threshold {value} for `{subject}` is outside 0..=100")]
    ThresholdOutOfRange { subject: String, value: u32 },
}
