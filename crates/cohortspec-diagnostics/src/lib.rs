//! Cohort specification diagnostics
//!
//! Error codes, source locations and diagnostic reporting shared by every
//! crate in the workspace. Loading codelists, compiling a study and running
//! an extraction all report failures through [`CohortError`]; non-fatal
//! findings (data-quality flags, suspicious simulation hints) are reported as
//! [`Diagnostic`] warnings.

mod error;
mod error_code;
mod span;

pub use error::*;
pub use error_code::*;
pub use span::*;

/// Result type for cohort specification operations
pub type Result<T> = std::result::Result<T, CohortError>;
