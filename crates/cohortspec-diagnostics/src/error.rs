//! Cohort specification error types

use crate::{ErrorCode, SourceLocation, Span};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// The specification cannot be compiled or run
    Error,
    /// Suspicious but usable (data-quality flags, odd simulation hints)
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic message attached to a named part of a specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    /// Variable, codelist or measure the message is about
    pub subject: Option<String>,
    /// Location inside the subject's expression text, if any
    pub location: Option<SourceLocation>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    fn with_severity(severity: Severity, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            subject: None,
            location: None,
            help: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render for a terminal, with colours when the `colored` feature is on
    #[cfg(feature = "colored")]
    pub fn render(&self) -> String {
        use colored::Colorize;

        let level = match self.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".blue().bold(),
        };
        let mut out = format!("{}[{}]: {}", level, self.code, self.message);
        if let Some(subject) = &self.subject {
            out.push_str(&format!("\n  {} {}", "-->".cyan(), subject));
            if let Some(loc) = &self.location {
                out.push_str(&format!(":{}", loc));
            }
        }
        if let Some(help) = self.help.as_deref().or(self.code.info().help) {
            out.push_str(&format!("\n  {} {}", "help:".green(), help));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(subject) = &self.subject {
            write!(f, " in {}", subject)?;
        }
        if let Some(loc) = &self.location {
            write!(f, " at {}", loc)?;
        }
        Ok(())
    }
}

/// Main error type for loading, compiling and running cohort specifications
#[derive(Debug, Clone, Error)]
pub enum CohortError {
    /// Predicate or date expression could not be parsed
    #[error("{code}: {message}")]
    Parse {
        code: ErrorCode,
        message: String,
        expression: String,
        location: Option<SourceLocation>,
    },

    /// The specification is inconsistent (references, ordering, rule shape)
    #[error("{code}: {message}")]
    Specification {
        code: ErrorCode,
        message: String,
        subject: Option<String>,
        context: Option<String>,
    },

    /// Extraction or aggregation failed
    #[error("{code}: {message}")]
    Evaluation {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// A codelist could not be loaded or is malformed
    #[error("{code}: {message}")]
    Codelist {
        code: ErrorCode,
        message: String,
        codelist: Option<String>,
        context: Option<String>,
    },

    /// I/O and configuration failures
    #[error("{code}: {message}")]
    System {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// Several errors collected by one validation pass
    #[error("{} errors, first: {}", .0.len(), .0.first().map(|e| e.to_string()).unwrap_or_default())]
    Multiple(Vec<CohortError>),
}

impl CohortError {
    pub fn parse(code: ErrorCode, message: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            expression: expression.into(),
            location: None,
        }
    }

    /// Parse error located at a byte offset of the expression
    pub fn parse_at(
        code: ErrorCode,
        message: impl Into<String>,
        expression: impl Into<String>,
        span: Span,
    ) -> Self {
        let expression = expression.into();
        let location = SourceLocation::from_span(span, &expression);
        Self::Parse {
            code,
            message: message.into(),
            expression,
            location: Some(location),
        }
    }

    pub fn specification(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Specification {
            code,
            message: message.into(),
            subject: None,
            context: None,
        }
    }

    pub fn evaluation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Evaluation {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn codelist(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Codelist {
            code,
            message: message.into(),
            codelist: None,
            context: None,
        }
    }

    pub fn system(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::System {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Collapse a list of errors: one stays itself, several become `Multiple`
    pub fn from_many(mut errors: Vec<CohortError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parse { code, .. }
            | Self::Specification { code, .. }
            | Self::Evaluation { code, .. }
            | Self::Codelist { code, .. }
            | Self::System { code, .. } => *code,
            Self::Multiple(errors) => errors.first().map(|e| e.code()).unwrap_or(ErrorCode::new(0)),
        }
    }

    /// Flatten into individual errors
    pub fn errors(&self) -> Vec<&CohortError> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Parse {
                code,
                message,
                expression,
                location,
            } => {
                let mut diag = Diagnostic::error(*code, message.clone())
                    .with_help(format!("in expression `{}`", expression.trim()));
                if let Some(loc) = location {
                    diag = diag.with_location(loc.clone());
                }
                diag
            }
            Self::Specification {
                code,
                message,
                subject,
                context,
            } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(subject) = subject {
                    diag = diag.with_subject(subject.clone());
                }
                if let Some(ctx) = context {
                    diag = diag.with_help(ctx.clone());
                }
                diag
            }
            Self::Codelist {
                code,
                message,
                codelist,
                context,
            } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(name) = codelist {
                    diag = diag.with_subject(name.clone());
                }
                if let Some(ctx) = context {
                    diag = diag.with_help(ctx.clone());
                }
                diag
            }
            Self::Evaluation { code, message, context } | Self::System { code, message, context } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(ctx) = context {
                    diag = diag.with_help(ctx.clone());
                }
                diag
            }
            Self::Multiple(errors) => errors
                .first()
                .map(|e| e.to_diagnostic())
                .unwrap_or_else(|| Diagnostic::error(ErrorCode::new(0), "Unknown error")),
        }
    }
}

/// Fluent construction of errors that carry a subject and context
pub struct ErrorBuilder {
    code: ErrorCode,
    message: String,
    subject: Option<String>,
    context: Option<String>,
}

impl ErrorBuilder {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            subject: None,
            context: None,
        }
    }

    /// Name of the variable, codelist or measure at fault
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn specification(self) -> CohortError {
        CohortError::Specification {
            code: self.code,
            message: self.message,
            subject: self.subject,
            context: self.context,
        }
    }

    pub fn codelist(self) -> CohortError {
        CohortError::Codelist {
            code: self.code,
            message: self.message,
            codelist: self.subject,
            context: self.context,
        }
    }

    pub fn evaluation(self) -> CohortError {
        CohortError::Evaluation {
            code: self.code,
            message: self.message,
            context: self.context,
        }
    }

    pub fn system(self) -> CohortError {
        CohortError::System {
            code: self.code,
            message: self.message,
            context: self.context,
        }
    }
}
