//! Error types and exit codes for accessquest
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure (I/O, database, download)
//! - 2: Usage error (bad flags/args, malformed filter expressions)
//! - 3: Data error (unknown quest, missing element)

mod macros;

use thiserror::Error;

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args or configuration (2)
    Usage = 2,
    /// Data error - missing quest or element (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<rusqlite::Error> for QuestError {
    fn from(err: rusqlite::Error) -> Self {
        QuestError::Other(err.to_string())
    }
}

/// Errors that can occur during accessquest operations
#[derive(Error, Debug)]
pub enum QuestError {
    // Usage / configuration errors (exit code 2)
    #[error("unknown format: {0} (expected: human or json)")]
    UnknownFormat(String),

    #[error("{0}")]
    UsageError(String),

    /// Malformed filter expression; `position` is the 0-based character column.
    #[error("{message} at position {position} in \"{source_text}\"")]
    FilterParse {
        message: String,
        position: usize,
        source_text: String,
    },

    #[error("duplicate quest type name: {name}")]
    DuplicateQuestType { name: String },

    #[error("invalid {context}: {value}")]
    InvalidValue { context: String, value: String },

    // Data errors (exit code 3)
    #[error("{context} not found: {value}")]
    NotFound { context: String, value: String },

    #[error("conflicting tag change for key '{key}': {reason}")]
    TagConflict { key: String, reason: String },

    #[error("element {element} has no geometry")]
    MissingGeometry { element: String },

    // Generic failures (exit code 1)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to {operation}: {reason}")]
    FailedOperation { operation: String, reason: String },

    #[error("download failed: {reason}")]
    Download { reason: String },

    #[error("query too big for bounding box {bbox}")]
    QueryTooBig { bbox: String },

    #[error("{0}")]
    Other(String),

    #[error("download cancelled")]
    Cancelled,
}

impl QuestError {
    /// Create an error for a failed database operation
    pub fn db_operation(operation: &str, error: impl std::fmt::Display) -> Self {
        QuestError::FailedOperation {
            operation: operation.to_string(),
            reason: error.to_string(),
        }
    }

    /// Create an error for a failed transaction operation
    pub fn transaction(operation: &str, error: impl std::fmt::Display) -> Self {
        QuestError::FailedOperation {
            operation: format!("{} transaction", operation),
            reason: error.to_string(),
        }
    }

    /// Create an error for a filter expression that could not be parsed
    pub fn filter_parse(message: impl Into<String>, position: usize, source: &str) -> Self {
        QuestError::FilterParse {
            message: message.into(),
            position,
            source_text: source.to_string(),
        }
    }

    /// Create an error for an invalid value or configuration
    pub fn invalid_value(context: &str, value: impl std::fmt::Display) -> Self {
        QuestError::InvalidValue {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for an entity that was not found
    pub fn not_found(context: &str, value: impl std::fmt::Display) -> Self {
        QuestError::NotFound {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    pub fn tag_conflict(key: &str, reason: impl std::fmt::Display) -> Self {
        QuestError::TagConflict {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn download(reason: impl std::fmt::Display) -> Self {
        QuestError::Download {
            reason: reason.to_string(),
        }
    }

    /// Whether this error is a cooperative cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, QuestError::Cancelled)
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            QuestError::UnknownFormat(_)
            | QuestError::UsageError(_)
            | QuestError::FilterParse { .. }
            | QuestError::DuplicateQuestType { .. }
            | QuestError::InvalidValue { .. } => ExitCode::Usage,

            QuestError::NotFound { .. }
            | QuestError::TagConflict { .. }
            | QuestError::MissingGeometry { .. } => ExitCode::Data,

            QuestError::Io(_)
            | QuestError::Json(_)
            | QuestError::Toml(_)
            | QuestError::FailedOperation { .. }
            | QuestError::Download { .. }
            | QuestError::QueryTooBig { .. }
            | QuestError::Other(_)
            | QuestError::Cancelled => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            QuestError::UnknownFormat(_) => "unknown_format",
            QuestError::UsageError(_) => "usage_error",
            QuestError::FilterParse { .. } => "filter_parse",
            QuestError::DuplicateQuestType { .. } => "duplicate_quest_type",
            QuestError::InvalidValue { .. } => "invalid_value",
            QuestError::NotFound { .. } => "not_found",
            QuestError::TagConflict { .. } => "tag_conflict",
            QuestError::MissingGeometry { .. } => "missing_geometry",
            QuestError::Io(_) => "io_error",
            QuestError::Json(_) => "json_error",
            QuestError::Toml(_) => "toml_error",
            QuestError::FailedOperation { .. } => "failed_operation",
            QuestError::Download { .. } => "download_error",
            QuestError::QueryTooBig { .. } => "query_too_big",
            QuestError::Other(_) => "other",
            QuestError::Cancelled => "cancelled",
        }
    }

    /// Convert error to JSON representation for structured error output
    pub fn to_json(&self) -> serde_json::Value {
        let mut error_obj = serde_json::json!({
            "code": self.exit_code() as i32,
            "type": self.error_type(),
            "message": self.to_string(),
        });

        if let QuestError::FilterParse { position, .. } = self {
            error_obj["position"] = serde_json::json!(position);
        }

        serde_json::json!({ "error": error_obj })
    }
}

/// Result type alias for accessquest operations
pub type Result<T> = std::result::Result<T, QuestError>;
