//! Ordered label catalog read from a newline-delimited text file.

use crate::error::{MarkerError, Result};
use std::collections::HashSet;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelCatalog {
    names: Vec<String>,
}

impl LabelCatalog {
    /// Reads one label per line. Blank lines and surrounding whitespace are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| MarkerError::LabelFile {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::parse(&text)?;
        if catalog.is_empty() {
            return Err(MarkerError::EmptyLabels(path.to_path_buf()));
        }
        Ok(catalog)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for line in text.lines() {
            let name = line.trim();
            if name.is_empty() {
                continue;
            }
            if !seen.insert(name) {
                return Err(MarkerError::DuplicateLabel(name.to_string()));
            }
            names.push(name.to_string());
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for LabelCatalog {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}
