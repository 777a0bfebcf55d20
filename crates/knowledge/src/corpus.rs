//! Default reference corpus used for the fallback index.

use crate::loader::DocumentLoader;
use crate::types::Document;
use aidoc_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Supplies the documents behind the fallback index.
#[async_trait::async_trait]
pub trait CorpusProvider: Send + Sync {
    /// Load the default documents.
    async fn default_documents(&self) -> AppResult<Vec<Document>>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Every supported file under a directory, in sorted path order.
pub struct DirectoryCorpus {
    dir: PathBuf,
    loader: Arc<dyn DocumentLoader>,
}

impl DirectoryCorpus {
    pub fn new(dir: impl Into<PathBuf>, loader: Arc<dyn DocumentLoader>) -> Self {
        Self {
            dir: dir.into(),
            loader,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl CorpusProvider for DirectoryCorpus {
    async fn default_documents(&self) -> AppResult<Vec<Document>> {
        let dir = self.dir.clone();
        let loader = Arc::clone(&self.loader);

        tokio::task::spawn_blocking(move || load_directory(&dir, loader.as_ref()))
            .await
            .map_err(|e| AppError::Other(format!("Corpus loading task failed: {}", e)))?
    }

    fn describe(&self) -> String {
        format!("directory {:?}", self.dir)
    }
}

fn load_directory(dir: &Path, loader: &dyn DocumentLoader) -> AppResult<Vec<Document>> {
    if !dir.is_dir() {
        return Err(AppError::Config(format!(
            "Default corpus directory does not exist: {:?}",
            dir
        )));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && loader.supports(e.path()))
        .map(|e| e.into_path())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(AppError::EmptyInput(format!(
            "no supported documents in {:?}",
            dir
        )));
    }

    tracing::info!("Loading {} default corpus files from {:?}", paths.len(), dir);

    paths.iter().map(|path| loader.load(path)).collect()
}

/// In-memory corpus.
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    documents: Vec<Document>,
}

impl StaticCorpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait::async_trait]
impl CorpusProvider for StaticCorpus {
    async fn default_documents(&self) -> AppResult<Vec<Document>> {
        if self.documents.is_empty() {
            return Err(AppError::EmptyInput("static corpus is empty".to_string()));
        }
        Ok(self.documents.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory documents", self.documents.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FileLoader;
    use std::fs;
    use tempfile::TempDir;

    fn corpus(dir: &Path) -> DirectoryCorpus {
        DirectoryCorpus::new(dir, Arc::new(FileLoader::new()))
    }

    #[tokio::test]
    async fn test_directory_corpus_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("cardiology")).unwrap();
        fs::write(temp.path().join("b.txt"), "beta").unwrap();
        fs::write(temp.path().join("a.md"), "alpha").unwrap();
        fs::write(temp.path().join("cardiology/c.txt"), "gamma").unwrap();
        fs::write(temp.path().join("cover.png"), [0u8, 1, 2]).unwrap();

        let documents = corpus(temp.path()).default_documents().await.unwrap();

        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.md", "b.txt", "c.txt"]);
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let temp = TempDir::new().unwrap();

        let err = corpus(temp.path()).default_documents().await.unwrap_err();
        assert!(matches!(err, AppError::EmptyInput(_)));
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let temp = TempDir::new().unwrap();

        let err = corpus(&temp.path().join("nope"))
            .default_documents()
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_bad_file_fails_whole_corpus() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("good.txt"), "fine").unwrap();
        fs::write(temp.path().join("bad.pdf"), "not really a pdf").unwrap();

        let err = corpus(temp.path()).default_documents().await.unwrap_err();
        assert!(matches!(err, AppError::DocumentLoad { .. }));
    }

    #[tokio::test]
    async fn test_static_corpus() {
        let corpus = StaticCorpus::new(vec![Document::new("manual", vec!["text".to_string()])]);
        assert_eq!(corpus.default_documents().await.unwrap().len(), 1);

        let empty = StaticCorpus::default();
        assert!(matches!(
            empty.default_documents().await,
            Err(AppError::EmptyInput(_))
        ));
    }
}
