//! Discovered-element catalog capability.
//!
//! # Responsibility
//! - Persist the player's discovered elements across sessions.
//! - Provide the starter elements for a fresh or reset catalog.
//!
//! # Invariants
//! - The catalog is append-only apart from an explicit `replace`.
//! - Stores never deduplicate; membership checks belong to the caller.

use crate::model::element::Element;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog persistence failure.
#[derive(Debug)]
pub enum CatalogError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "catalog io failed for `{}`: {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "catalog `{}` is not valid json: {source}", path.display())
            }
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

/// Storage capability for discovered elements.
pub trait CatalogStore {
    /// Reads every stored element in discovery order.
    fn load(&self) -> CatalogResult<Vec<Element>>;
    /// Appends one newly discovered element.
    fn append(&mut self, element: &Element) -> CatalogResult<()>;
    /// Replaces the whole catalog.
    fn replace(&mut self, elements: &[Element]) -> CatalogResult<()>;
}

impl<S: CatalogStore + ?Sized> CatalogStore for Box<S> {
    fn load(&self) -> CatalogResult<Vec<Element>> {
        (**self).load()
    }

    fn append(&mut self, element: &Element) -> CatalogResult<()> {
        (**self).append(element)
    }

    fn replace(&mut self, elements: &[Element]) -> CatalogResult<()> {
        (**self).replace(elements)
    }
}

/// Elements every new player starts with.
pub fn starter_elements() -> Vec<Element> {
    vec![
        Element::new("💧", "water"),
        Element::new("🔥", "fire"),
        Element::new("🌬️", "wind"),
        Element::new("🌍", "earth"),
    ]
}

/// Catalog kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    elements: Vec<Element>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elements(elements: Vec<Element>) -> Self {
        Self { elements }
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn load(&self) -> CatalogResult<Vec<Element>> {
        Ok(self.elements.clone())
    }

    fn append(&mut self, element: &Element) -> CatalogResult<()> {
        self.elements.push(element.clone());
        Ok(())
    }

    fn replace(&mut self, elements: &[Element]) -> CatalogResult<()> {
        self.elements = elements.to_vec();
        Ok(())
    }
}

/// Catalog stored as a JSON array of elements in one file.
#[derive(Debug, Clone)]
pub struct JsonFileCatalogStore {
    path: PathBuf,
}

impl JsonFileCatalogStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self, elements: &[Element]) -> CatalogResult<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let json = serde_json::to_string_pretty(elements).map_err(|source| CatalogError::Json {
            path: self.path.clone(),
            source,
        })?;
        // Write-then-rename keeps the previous catalog intact on failure.
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, json).map_err(|source| self.io_error(source))?;
        std::fs::rename(&staging, &self.path).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> CatalogError {
        CatalogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CatalogStore for JsonFileCatalogStore {
    fn load(&self) -> CatalogResult<Vec<Element>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        if json.trim().is_empty() {
            warn!(
                "event=catalog_load module=catalog status=empty_file path={}",
                self.path.display()
            );
            return Ok(Vec::new());
        }
        serde_json::from_str(&json).map_err(|source| CatalogError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn append(&mut self, element: &Element) -> CatalogResult<()> {
        let mut elements = self.load()?;
        elements.push(element.clone());
        self.write_all(&elements)
    }

    fn replace(&mut self, elements: &[Element]) -> CatalogResult<()> {
        self.write_all(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::{starter_elements, CatalogStore, InMemoryCatalogStore};
    use crate::model::element::Element;

    #[test]
    fn starter_elements_are_the_four_classics() {
        let names: Vec<String> = starter_elements().iter().map(Element::identity).collect();
        assert_eq!(names, ["water", "fire", "wind", "earth"]);
    }

    #[test]
    fn in_memory_store_appends_and_replaces() {
        let mut store = InMemoryCatalogStore::new();
        store.append(&Element::new("💨", "steam")).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);

        store.replace(&starter_elements()).unwrap();
        assert_eq!(store.load().unwrap(), starter_elements());
    }
}
