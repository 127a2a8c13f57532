//! Reader capability trait and registry (§6 external interfaces).
//!
//! Individual format readers (PDF/DOCX/XLSX/PPTX/HWP/HTML/MD/TXT) are out of
//! scope for this crate; it only consumes anything implementing `Reader`.
//! This replaces an inheritance-heavy reader hierarchy (§9 design notes)
//! with a capability trait plus an extension-keyed registry.

use crate::error::{ReaderError, Result};
use crate::raw::RawContent;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// A source the pipeline can extract from.
pub enum Source<'a> {
    Path(&'a Path),
    Bytes { name: &'a str, bytes: &'a [u8] },
}

impl<'a> Source<'a> {
    pub fn extension(&self) -> Option<String> {
        match self {
            Source::Path(p) => p.extension().and_then(|e| e.to_str()).map(|s| s.to_string()),
            Source::Bytes { name, .. } => {
                Path::new(name).extension().and_then(|e| e.to_str()).map(|s| s.to_string())
            }
        }
    }
}

/// Capability trait every format reader implements. Must be deterministic
/// for the same bytes (same `RawContent` except `id`/timestamps).
#[async_trait]
pub trait Reader: Send + Sync {
    /// File extensions (lowercase, no dot) this reader handles.
    fn extensions(&self) -> &[&str];

    async fn extract(&self, source: Source<'_>) -> Result<RawContent>;
}

/// Maps a file extension (case-insensitive) to the first registered reader
/// that claims it.
#[derive(Default, Clone)]
pub struct ReaderRegistry {
    readers: Vec<Arc<dyn Reader>>,
    by_extension: HashMap<String, usize>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reader. Later registrations for an already-claimed
    /// extension are ignored — the factory returns the *first* match.
    pub fn register(&mut self, reader: Arc<dyn Reader>) {
        let idx = self.readers.len();
        for ext in reader.extensions() {
            self.by_extension.entry(ext.to_ascii_lowercase()).or_insert(idx);
        }
        self.readers.push(reader);
    }

    pub fn reader_for_extension(&self, ext: &str) -> Option<Arc<dyn Reader>> {
        self.by_extension
            .get(&ext.to_ascii_lowercase())
            .map(|&idx| self.readers[idx].clone())
    }

    pub async fn extract(&self, source: Source<'_>) -> Result<RawContent> {
        let ext = source.extension().unwrap_or_default();
        let reader = self
            .reader_for_extension(&ext)
            .ok_or_else(|| ReaderError::UnsupportedFormat(ext.clone()))?;
        reader.extract(source).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::FileInfo;

    struct TxtReader;

    #[async_trait]
    impl Reader for TxtReader {
        fn extensions(&self) -> &[&str] {
            &["txt"]
        }

        async fn extract(&self, source: Source<'_>) -> Result<RawContent> {
            match source {
                Source::Bytes { name, bytes } => {
                    let text = String::from_utf8_lossy(bytes).to_string();
                    Ok(RawContent::new(
                        FileInfo::in_memory(name, bytes.len() as u64),
                        text,
                    ))
                }
                Source::Path(_) => Err(ReaderError::SourceUnreadable("unsupported in test".into()).into()),
            }
        }
    }

    #[tokio::test]
    async fn registry_dispatches_by_extension() {
        let mut registry = ReaderRegistry::new();
        registry.register(Arc::new(TxtReader));

        let raw = registry
            .extract(Source::Bytes {
                name: "doc.txt",
                bytes: b"hello",
            })
            .await
            .unwrap();
        assert_eq!(raw.text, "hello");
    }

    #[tokio::test]
    async fn registry_rejects_unknown_extension() {
        let registry = ReaderRegistry::new();
        let err = registry
            .extract(Source::Bytes {
                name: "doc.xyz",
                bytes: b"hello",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::Reader(ReaderError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn first_registration_wins_on_conflict() {
        struct OtherTxtReader;
        #[async_trait]
        impl Reader for OtherTxtReader {
            fn extensions(&self) -> &[&str] {
                &["txt"]
            }
            async fn extract(&self, _source: Source<'_>) -> Result<RawContent> {
                Ok(RawContent::new(FileInfo::in_memory("other", 0), "other".into()))
            }
        }

        let mut registry = ReaderRegistry::new();
        registry.register(Arc::new(TxtReader));
        registry.register(Arc::new(OtherTxtReader));

        let raw = registry
            .extract(Source::Bytes { name: "x.txt", bytes: b"hi" })
            .await
            .unwrap();
        assert_eq!(raw.text, "hi");
    }
}
