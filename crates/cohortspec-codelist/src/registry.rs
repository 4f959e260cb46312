//! Named codelist registry

use crate::codelist::{Codelist, CodelistSource, CodelistSpec};
use crate::loader::load_csv;
use cohortspec_diagnostics::{
    COH0101, COH0306, COH0310, CohortError, Diagnostic, ErrorBuilder, Result,
};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Registry of loaded codelists, shared read-only once built
#[derive(Debug, Clone, Default)]
pub struct CodelistRegistry {
    base_dir: Option<PathBuf>,
    lists: IndexMap<String, Arc<Codelist>>,
}

impl CodelistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry resolving relative CSV paths against `dir`
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
            lists: IndexMap::new(),
        }
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Register an already built codelist
    pub fn insert(&mut self, list: Codelist) -> Result<Arc<Codelist>> {
        if self.lists.contains_key(list.name()) {
            return Err(ErrorBuilder::new(
                COH0306,
                format!("Codelist '{}' is already registered", list.name()),
            )
            .subject(list.name())
            .codelist());
        }
        if let Some(flag) = list.quality_flag() {
            log::warn!("codelist '{}': {}", list.name(), flag);
        }
        let list = Arc::new(list);
        self.lists.insert(list.name().to_string(), Arc::clone(&list));
        Ok(list)
    }

    /// Load one declared codelist and register it
    pub fn load(&mut self, spec: &CodelistSpec) -> Result<Arc<Codelist>> {
        let list = match &spec.source {
            CodelistSource::Inline { codes } => {
                Codelist::inline(&spec.name, spec.system, codes.iter().cloned())?
            }
            CodelistSource::Csv {
                path,
                column,
                category_column,
            } => load_csv(
                &spec.name,
                spec.system,
                &self.resolve(path),
                column,
                category_column.as_deref(),
            )?,
            CodelistSource::Derived { from } => {
                let parents = from
                    .iter()
                    .map(|name| self.require(name))
                    .collect::<Result<Vec<_>>>()?;
                let refs: Vec<&Codelist> = parents.iter().map(|p| p.as_ref()).collect();
                Codelist::combine(&spec.name, &refs)?
            }
        };
        self.insert(list.with_quality_flag(spec.quality_flag.clone()))
    }

    /// Load every declaration, reporting all failures together
    pub fn load_all<'a, I>(&mut self, specs: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a CodelistSpec>,
    {
        let errors: Vec<CohortError> = specs
            .into_iter()
            .filter_map(|spec| self.load(spec).err())
            .collect();
        match CohortError::from_many(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Codelist>> {
        self.lists.get(name).cloned()
    }

    /// Look up a codelist a specification refers to
    pub fn require(&self, name: &str) -> Result<Arc<Codelist>> {
        self.get(name).ok_or_else(|| {
            ErrorBuilder::new(COH0101, format!("Undefined codelist '{}'", name))
                .subject(name)
                .specification()
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lists.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Codelist>> {
        self.lists.values()
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Data-quality flags as warnings
    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.lists
            .values()
            .filter_map(|list| {
                list.quality_flag().map(|flag| {
                    Diagnostic::warning(COH0310, flag.to_string()).with_subject(list.name())
                })
            })
            .collect()
    }
}
