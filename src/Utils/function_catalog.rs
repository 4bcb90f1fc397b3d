//! Ordered list of saved function strings, persisted as `{"functions": [...]}`.
//!
//! Entries are trimmed, unique and compile with the catalog's `ExpressionCompiler`.

use crate::symbolic::expression_compiler::{Expression, ExpressionCompiler, InvalidExpression};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Sample entries for an empty catalog.
pub const DEFAULT_FUNCTIONS: [&str; 5] = ["x**2", "sin(x)", "exp(x)", "x**3 - 2*x", "1/(x**2 + 1)"];

#[derive(Debug)]
pub enum CatalogError {
    Empty,
    Duplicate(String),
    Invalid {
        source: String,
        reason: InvalidExpression,
    },
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CatalogError::Empty => write!(f, "Function is empty"),
            CatalogError::Duplicate(source) => write!(f, "'{}' is already in the list", source),
            CatalogError::Invalid { source, reason } => {
                write!(f, "'{}' is not a valid function: {}", source, reason)
            }
            CatalogError::IndexOutOfRange { index, len } => {
                write!(f, "Index {} out of range for {} functions", index, len)
            }
            CatalogError::Io(err) => write!(f, "I/O error: {}", err),
            CatalogError::Json(err) => write!(f, "JSON error: {}", err),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Invalid { reason, .. } => Some(reason),
            CatalogError::Io(err) => Some(err),
            CatalogError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Json(err)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    functions: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionCatalog {
    functions: Vec<String>,
    compiler: ExpressionCompiler,
}

impl FunctionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compiler(compiler: ExpressionCompiler) -> Self {
        FunctionCatalog {
            functions: Vec::new(),
            compiler,
        }
    }

    pub fn list(&self) -> &[String] {
        &self.functions
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.functions.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Appends `source` (trimmed). Returns its index.
    pub fn add(&mut self, source: &str) -> Result<usize, CatalogError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(CatalogError::Empty);
        }
        if self.functions.iter().any(|f| f == source) {
            return Err(CatalogError::Duplicate(source.to_string()));
        }
        if let Err(reason) = self.compiler.compile(source) {
            return Err(CatalogError::Invalid {
                source: source.to_string(),
                reason,
            });
        }
        self.functions.push(source.to_string());
        Ok(self.functions.len() - 1)
    }

    /// Removes and returns the entry at `index`.
    pub fn remove(&mut self, index: usize) -> Result<String, CatalogError> {
        if index >= self.functions.len() {
            return Err(CatalogError::IndexOutOfRange {
                index,
                len: self.functions.len(),
            });
        }
        Ok(self.functions.remove(index))
    }

    /// Adds every entry of `DEFAULT_FUNCTIONS` not yet present.
    pub fn seed_defaults(&mut self) {
        for source in DEFAULT_FUNCTIONS {
            if !self.functions.iter().any(|f| f == source) {
                if let Err(err) = self.add(source) {
                    warn!("default function skipped: {}", err);
                }
            }
        }
    }

    pub fn save_to_json(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let file = File::create(path.as_ref())?;
        let document = CatalogFile {
            functions: self.functions.clone(),
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &document)?;
        info!(
            "saved {} functions to {}",
            self.functions.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Replaces the entries with those stored at `path`, returning how many were kept.
    ///
    /// A missing or unreadable file leaves the catalog empty. Entries that fail `add`
    /// (blank, duplicate, invalid) are dropped.
    pub fn load_from_json(&mut self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        self.functions.clear();
        let document = match read_catalog_file(path) {
            Ok(document) => document,
            Err(err) => {
                warn!("no functions loaded from {}: {}", path.display(), err);
                return 0;
            }
        };
        for source in &document.functions {
            if let Err(err) = self.add(source) {
                warn!("skipping stored function: {}", err);
            }
        }
        info!("loaded {} functions from {}", self.functions.len(), path.display());
        self.functions.len()
    }

    /// Compiles every entry in parallel, in list order.
    pub fn compile_all(
        &self,
        compiler: &ExpressionCompiler,
    ) -> Vec<(String, Result<Expression, InvalidExpression>)> {
        self.functions
            .par_iter()
            .map(|source| (source.clone(), compiler.compile(source)))
            .collect()
    }
}

fn read_catalog_file(path: &Path) -> Result<CatalogFile, CatalogError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::expression_compiler::ProbeDomain;
    use tempfile::tempdir;

    #[test]
    fn test_add_validates_entries() {
        let mut catalog = FunctionCatalog::new();
        assert_eq!(catalog.add("  x**2  ").unwrap(), 0);
        assert_eq!(catalog.add("sin(x)").unwrap(), 1);
        assert_eq!(catalog.list(), &["x**2".to_string(), "sin(x)".to_string()]);
        assert!(matches!(catalog.add("   "), Err(CatalogError::Empty)));
        assert!(matches!(catalog.add("x**2"), Err(CatalogError::Duplicate(_))));
        assert!(matches!(
            catalog.add("__import__('os').system('ls')"),
            Err(CatalogError::Invalid {
                reason: InvalidExpression::DisallowedIdentifier { .. },
                ..
            })
        ));
        assert!(matches!(
            catalog.add("1/x"),
            Err(CatalogError::Invalid {
                reason: InvalidExpression::NonFinite { .. },
                ..
            })
        ));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_get_and_remove() {
        let mut catalog = FunctionCatalog::new();
        catalog.add("x").unwrap();
        catalog.add("cos(x)").unwrap();
        catalog.add("abs(x)").unwrap();
        assert_eq!(catalog.get(1), Some("cos(x)"));
        assert_eq!(catalog.get(3), None);
        assert_eq!(catalog.remove(1).unwrap(), "cos(x)");
        assert_eq!(catalog.list(), &["x".to_string(), "abs(x)".to_string()]);
        assert!(matches!(
            catalog.remove(2),
            Err(CatalogError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_save_then_load_preserves_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("functions.json");
        let mut catalog = FunctionCatalog::new();
        for source in ["x**3", "exp(x)", "x", "tan(x)"] {
            catalog.add(source).unwrap();
        }
        catalog.save_to_json(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["functions"][1], "exp(x)");

        let mut loaded = FunctionCatalog::new();
        assert_eq!(loaded.load_from_json(&path), 4);
        assert_eq!(loaded.list(), catalog.list());
    }

    #[test]
    fn test_load_missing_or_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let mut catalog = FunctionCatalog::new();
        catalog.add("x").unwrap();
        assert_eq!(catalog.load_from_json(dir.path().join("missing.json")), 0);
        assert!(catalog.is_empty());

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "{\"functions\": [\"x\", ").unwrap();
        assert_eq!(catalog.load_from_json(&corrupt), 0);

        let wrong_shape = dir.path().join("wrong.json");
        std::fs::write(&wrong_shape, "[\"x\"]").unwrap();
        assert_eq!(catalog.load_from_json(&wrong_shape), 0);
    }

    #[test]
    fn test_load_drops_invalid_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("functions.json");
        std::fs::write(
            &path,
            r#"{"functions": ["x", "open('f')", "x", "log(x)", " cos(x) ", ""]}"#,
        )
        .unwrap();
        let mut catalog = FunctionCatalog::new();
        assert_eq!(catalog.load_from_json(&path), 2);
        assert_eq!(catalog.list(), &["x".to_string(), "cos(x)".to_string()]);
    }

    #[test]
    fn test_seed_defaults() {
        let mut catalog = FunctionCatalog::new();
        catalog.add("sin(x)").unwrap();
        catalog.seed_defaults();
        assert_eq!(catalog.len(), DEFAULT_FUNCTIONS.len());
        assert_eq!(catalog.get(0), Some("sin(x)"));
    }

    #[test]
    fn test_compile_all_keeps_order() {
        let mut catalog = FunctionCatalog::new();
        for source in DEFAULT_FUNCTIONS {
            catalog.add(source).unwrap();
        }
        let compiled = catalog.compile_all(&ExpressionCompiler::new());
        let names: Vec<&str> = compiled.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(names, DEFAULT_FUNCTIONS.to_vec());
        assert!(compiled.iter().all(|(_, result)| result.is_ok()));

        // a narrower compiler may reject entries the catalog accepted
        let strict = ExpressionCompiler::new().with_probe(ProbeDomain {
            lower: -1000.0,
            upper: 1000.0,
            samples: 101,
            scalar: 0.0,
        });
        let compiled = catalog.compile_all(&strict);
        let rejected: Vec<&str> = compiled
            .iter()
            .filter(|(_, result)| result.is_err())
            .map(|(s, _)| s.as_str())
            .collect();
        assert_eq!(rejected, vec!["exp(x)"]);
    }

    #[test]
    fn test_custom_compiler_variable() {
        let mut catalog = FunctionCatalog::with_compiler(ExpressionCompiler::new().with_variable("t"));
        assert!(catalog.add("t^2").is_ok());
        assert!(catalog.add("x^2").is_err());
    }
}
