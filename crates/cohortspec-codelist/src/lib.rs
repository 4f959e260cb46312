//! Codelists for cohort specifications
//!
//! A codelist is a named, immutable set of clinical terminology codes that
//! represents one concept (pancreatic cancer, jaundice, a lab test). Lists are
//! declared inline or loaded from CSV files and are held in a
//! [`CodelistRegistry`] that the study compiler resolves names against.

mod codelist;
mod loader;
mod registry;
mod system;

pub use codelist::{Codelist, CodelistSource, CodelistSpec};
pub use loader::{load_csv, read_csv};
pub use registry::CodelistRegistry;
pub use system::CodingSystem;
