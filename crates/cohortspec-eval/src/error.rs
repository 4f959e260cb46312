//! Evaluation errors for the reference extractor

use cohortspec_diagnostics::{
    COH0200, COH0201, COH0202, COH0203, COH0204, COH0205, CohortError, ErrorBuilder, ErrorCode,
};
use thiserror::Error;

/// Result type for extraction and aggregation
pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Error, Clone)]
pub enum EvalError {
    /// Operands an operator cannot combine
    #[error("Cannot apply {operator} to {left} and {right}")]
    TypeMismatch {
        operator: String,
        left: &'static str,
        right: &'static str,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: String },

    /// Identifier with no value in scope
    #[error("Unresolved variable: {name}")]
    UnresolvedVariable { name: String },

    #[error("Date arithmetic overflow in '{expression}'")]
    DateOverflow { expression: String },

    /// Records could not be read or are inconsistent
    #[error("Record source error: {message}")]
    Source { message: String },

    /// Failure while resolving one variable for one patient
    #[error("patient {patient_id}, variable '{variable}': {source}")]
    Variable {
        patient_id: u64,
        variable: String,
        #[source]
        source: Box<EvalError>,
    },
}

impl EvalError {
    pub fn type_mismatch(operator: impl Into<String>, left: &'static str, right: &'static str) -> Self {
        Self::TypeMismatch {
            operator: operator.into(),
            left,
            right,
        }
    }

    pub fn overflow(operation: impl Into<String>) -> Self {
        Self::Overflow {
            operation: operation.into(),
        }
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::UnresolvedVariable { name: name.into() }
    }

    pub fn record_source(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    /// Attach the patient and variable being resolved
    pub fn in_variable(self, patient_id: u64, variable: impl Into<String>) -> Self {
        Self::Variable {
            patient_id,
            variable: variable.into(),
            source: Box::new(self),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::TypeMismatch { .. } => COH0201,
            Self::DivisionByZero => COH0202,
            Self::Overflow { .. } => COH0200,
            Self::UnresolvedVariable { .. } => COH0203,
            Self::DateOverflow { .. } => COH0204,
            Self::Source { .. } => COH0205,
            Self::Variable { source, .. } => source.code(),
        }
    }
}

impl From<EvalError> for CohortError {
    fn from(err: EvalError) -> Self {
        let code = err.code();
        match &err {
            EvalError::Variable {
                patient_id,
                variable,
                source,
            } => ErrorBuilder::new(code, source.to_string())
                .context(format!("patient {}, variable '{}'", patient_id, variable))
                .evaluation(),
            _ => CohortError::evaluation(code, err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_error_keeps_inner_code() {
        let err = EvalError::DivisionByZero.in_variable(7, "imd_quin");
        assert_eq!(err.code(), COH0202);
        assert!(err.to_string().contains("imd_quin"));

        let cohort: CohortError = err.into();
        assert_eq!(cohort.code(), COH0202);
        assert_eq!(
            cohort.to_diagnostic().help.as_deref(),
            Some("patient 7, variable 'imd_quin'")
        );
    }
}
