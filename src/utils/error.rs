use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Attribute not found: {key}")]
    AttributeNotFound { key: String },

    #[error("Header length mismatch: expected {expected} values, got {actual}")]
    HeaderLengthMismatch { expected: usize, actual: usize },

    #[error("Sink '{sink}' failed: {message}")]
    SinkError { sink: String, message: String },

    #[error("Stage '{stage}' cleared the end-of-stream marker")]
    EndMarkerCleared { stage: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Data,
    Sink,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        EtlError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn sink(sink: impl Into<String>, message: impl Into<String>) -> Self {
        EtlError::SinkError {
            sink: sink.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::InvalidArgument { .. } => ErrorCategory::Configuration,
            EtlError::AttributeNotFound { .. }
            | EtlError::HeaderLengthMismatch { .. }
            | EtlError::EndMarkerCleared { .. } => ErrorCategory::Data,
            EtlError::SinkError { .. } | EtlError::CsvError(_) | EtlError::SerializationError(_) => {
                ErrorCategory::Sink
            }
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Data => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Sink => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::InvalidArgument { .. } => {
                "Check the stage configuration (trim mode, column list, batch size)"
            }
            EtlError::AttributeNotFound { .. } => {
                "Make sure the producer sets the attribute before the stage reads it"
            }
            EtlError::HeaderLengthMismatch { .. } => {
                "Align the header with the row width, or use the 'truncate' length policy"
            }
            EtlError::SinkError { .. } | EtlError::CsvError(_) | EtlError::SerializationError(_) => {
                "The buffered batch was kept; retry the stream or abort it"
            }
            EtlError::EndMarkerCleared { .. } => {
                "Transform stages must return the frame they received with its end marker intact"
            }
            EtlError::IoError(_) => "Check file permissions and available disk space",
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => "Review the pipeline TOML configuration",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Pipeline is misconfigured: {}", self),
            ErrorCategory::Data => format!("A frame could not be processed: {}", self),
            ErrorCategory::Sink => format!("Writing a batch failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
