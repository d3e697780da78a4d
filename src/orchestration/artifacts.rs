//! Request-scoped artifact files
//!
//! Workers write charts and data extracts into `<temp_dir>/<task_id>/` and
//! refer to them by file name inside their replies. The graphs only ever look
//! names up; nothing here creates files except [`ArtifactScope::ensure_dir`],
//! which the driver calls once before a run.

use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::constants::pipeline::SALES_HISTORY_FILE;
use crate::types::Result;

static FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([\w\-]+(?:\.[\w\-]+)*\.(?:png|jpe?g|svg|csv|xlsx|json|md|pdf|txt))\b")
        .expect("artifact file name pattern is valid")
});

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "svg"];

/// Per-request directory for worker artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactScope {
    root: PathBuf,
}

impl ArtifactScope {
    pub fn new(temp_dir: &Path, task_id: &str) -> Self {
        Self {
            root: temp_dir.join(task_id),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File names mentioned in `text`, in order of first appearance
    pub fn files_mentioned(text: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        FILE_NAME
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Path of `name` inside the scope. Directory components are dropped;
    /// names without a file component (`.`, `..`) resolve to nothing.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        Path::new(name)
            .file_name()
            .map(|file_name| self.root.join(file_name))
    }

    /// Resolve the mentioned names that exist on disk
    pub fn existing(&self, names: &[String]) -> Vec<PathBuf> {
        names
            .iter()
            .filter_map(|name| self.resolve(name))
            .filter(|path| path.is_file())
            .collect()
    }

    /// File names currently in the scope, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Where the sales history extract is stored
    pub fn sales_history_location(&self) -> PathBuf {
        self.root.join(SALES_HISTORY_FILE)
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    /// Image files currently in the scope
    pub fn images(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .list()?
            .into_iter()
            .map(|name| self.root.join(name))
            .filter(|p| Self::is_image(p))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_files_mentioned() {
        let text = "Saved the chart to monthly_sales.png and the data to sales-2024.csv. \
                    See monthly_sales.png again; report.v2.md is final. Not a file: 3.5";
        assert_eq!(
            ArtifactScope::files_mentioned(text),
            vec!["monthly_sales.png", "sales-2024.csv", "report.v2.md"]
        );
    }

    #[test]
    fn test_resolve_strips_directories() {
        let scope = ArtifactScope::new(Path::new("/tmp/kpi"), "sales_report_total_sales");
        assert_eq!(
            scope.resolve("../../etc/chart.png").unwrap(),
            PathBuf::from("/tmp/kpi/sales_report_total_sales/chart.png")
        );
        assert_eq!(scope.resolve(".."), None);
        assert_eq!(scope.resolve("."), None);
        assert_eq!(scope.resolve("charts/.."), None);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let scope = ArtifactScope::new(temp.path(), "absent");
        assert!(scope.list().unwrap().is_empty());
        // Resolution is a pure lookup
        let _ = scope.resolve("chart.png");
        assert!(!scope.root().exists());
    }

    #[test]
    fn test_list_and_images() {
        let temp = TempDir::new().unwrap();
        let scope = ArtifactScope::new(temp.path(), "t1");
        scope.ensure_dir().unwrap();
        fs::write(scope.resolve("b.csv").unwrap(), "x").unwrap();
        fs::write(scope.resolve("a.png").unwrap(), "x").unwrap();

        assert_eq!(scope.list().unwrap(), vec!["a.png", "b.csv"]);
        assert_eq!(scope.images().unwrap(), vec![scope.resolve("a.png").unwrap()]);
        assert_eq!(
            scope.existing(&["a.png".to_string(), "missing.png".to_string()]),
            vec![scope.resolve("a.png").unwrap()]
        );
    }
}
