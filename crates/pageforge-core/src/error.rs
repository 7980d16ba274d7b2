//! Error types for pageforge operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageForgeError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Invalid page selection: {0}")]
    InvalidSelection(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Wrong password")]
    WrongPassword,

    #[error("Invalid encryption policy: {0}")]
    PolicyError(String),

    #[error("Document is already encrypted")]
    AlreadyEncrypted,

    #[error("Document is not encrypted")]
    NotEncrypted,

    #[error("Document is encrypted: {0}")]
    EncryptedInput(String),

    #[error("Unrecoverable document: {0}")]
    Unrecoverable(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Step {index} ({operation}) failed: {source}")]
    WorkflowStep {
        index: usize,
        operation: String,
        #[source]
        source: Box<PageForgeError>,
    },
}

impl PageForgeError {
    /// Wrap an error with workflow step context
    pub fn at_step(self, index: usize, operation: &str) -> Self {
        PageForgeError::WorkflowStep {
            index,
            operation: operation.to_string(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PageForgeError::ParseError("not a PDF".to_string());
        assert_eq!(err.to_string(), "Failed to parse PDF: not a PDF");
    }

    #[test]
    fn test_step_wrapping_preserves_context() {
        let err = PageForgeError::OperationError("no AcroForm".to_string()).at_step(1, "flatten");
        let msg = err.to_string();
        assert!(msg.contains("Step 1"));
        assert!(msg.contains("flatten"));
        assert!(msg.contains("no AcroForm"));
    }
}
