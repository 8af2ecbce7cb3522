use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::embeddings::base::Embedder;
use crate::index::base::{VectorIndex, VectorRecord};
use crate::splitter::RecursiveCharacterSplitter;

const EMBED_BATCH_SIZE: usize = 32;

/// Counts reported after loading one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub chunks: usize,
}

/// Splits documents, embeds the chunks and upserts them with `{text, source}` metadata
pub struct Ingestor {
    splitter: RecursiveCharacterSplitter,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Ingestor {
    pub fn new(
        splitter: RecursiveCharacterSplitter,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            splitter,
            embedder,
            index,
        }
    }

    pub async fn ingest_text(&self, source: &str, text: &str) -> Result<IngestReport> {
        let chunks = self.splitter.split(text);
        if chunks.is_empty() {
            tracing::warn!(source, "document produced no chunks");
            return Ok(IngestReport::default());
        }

        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let vectors = self.embedder.embed_batch(batch).await?;
            let records = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, values)| VectorRecord {
                    id: Uuid::new_v4().to_string(),
                    values,
                    text: chunk.clone(),
                    source: source.to_string(),
                })
                .collect();
            self.index.upsert(records).await?;
        }

        tracing::info!(source, chunks = chunks.len(), "ingested document");
        Ok(IngestReport {
            chunks: chunks.len(),
        })
    }

    /// Split each page on its own so no chunk straddles a page break
    pub async fn ingest_pages(&self, source: &str, pages: &[String]) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for page in pages.iter().filter(|page| !page.trim().is_empty()) {
            report.chunks += self.ingest_text(source, page).await?.chunks;
        }
        if report.chunks == 0 {
            tracing::warn!(source, pages = pages.len(), "document has no extractable text");
        }
        Ok(report)
    }

    /// Load a PDF page by page, or any other file as UTF-8 text; the path becomes the chunk source
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport> {
        let source = path.display().to_string();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", source))?;
            let pages = tokio::task::spawn_blocking(move || pdf_pages(&bytes))
                .await?
                .with_context(|| format!("Failed to extract text from {}", source))?;
            return self.ingest_pages(&source, &pages).await;
        }

        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", source))?;
        self.ingest_text(&source, &text).await
    }
}

/// Text of every page, in page order
fn pdf_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let document = lopdf::Document::load_mem(bytes)?;
    document
        .get_pages()
        .keys()
        .map(|&number| {
            document
                .extract_text(&[number])
                .with_context(|| format!("page {}", number))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::base::fake::FakeEmbedder;
    use crate::index::memory::InMemoryIndex;
    use std::sync::atomic::Ordering;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_ingest_text_upserts_chunks_with_source() -> Result<()> {
        let index = Arc::new(InMemoryIndex::new());
        let embedder = Arc::new(FakeEmbedder::new());
        let ingestor = Ingestor::new(
            RecursiveCharacterSplitter::new(30, 0)?,
            embedder.clone(),
            index.clone(),
        );

        let report = ingestor
            .ingest_text("about.md", "We are a software house.\n\nWe build apps.")
            .await?;
        assert_eq!(report.chunks, 2);
        assert_eq!(index.len().await, 2);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

        let matches = index.query(&FakeEmbedder::vector("We build apps."), 1).await?;
        assert_eq!(matches[0].text, "We build apps.");
        assert_eq!(matches[0].source, "about.md");
        Ok(())
    }

    #[tokio::test]
    async fn test_ingest_batches_embeddings() -> Result<()> {
        let embedder = Arc::new(FakeEmbedder::new());
        let ingestor = Ingestor::new(
            RecursiveCharacterSplitter::new(2, 0)?,
            embedder.clone(),
            Arc::new(InMemoryIndex::new()),
        );

        let text = vec!["x"; 40].join(" ");
        let report = ingestor.ingest_text("x.txt", &text).await?;
        assert_eq!(report.chunks, 40);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    /// A minimal PDF with one line of Courier text per page
    fn write_pdf(path: &Path, pages: &[&str]) {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => pages.len() as i64,
                "Kids" => kids,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[tokio::test]
    async fn test_ingest_text_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("faq.md");
        std::fs::write(&path, "Office hours are nine to five.")?;

        let index = Arc::new(InMemoryIndex::new());
        let ingestor = Ingestor::new(
            RecursiveCharacterSplitter::default(),
            Arc::new(FakeEmbedder::new()),
            index.clone(),
        );
        assert_eq!(ingestor.ingest_file(&path).await?.chunks, 1);

        let matches = index.query(&FakeEmbedder::vector("hours"), 1).await?;
        assert_eq!(matches[0].source, path.display().to_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_ingest_pdf_per_page() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("brochure.PDF");
        write_pdf(&path, &["We build mobile apps.", "", "Office hours are nine to five."]);

        let index = Arc::new(InMemoryIndex::new());
        let ingestor = Ingestor::new(
            RecursiveCharacterSplitter::default(),
            Arc::new(FakeEmbedder::new()),
            index.clone(),
        );

        let report = ingestor.ingest_file(&path).await?;
        assert_eq!(report.chunks, 2);

        let matches = index.query(&FakeEmbedder::vector("x"), 10).await?;
        let mut texts: Vec<String> = matches.iter().map(|m| m.text.clone()).collect();
        texts.sort();
        assert!(texts[0].contains("Office hours are nine to five."));
        assert!(texts[1].contains("We build mobile apps."));
        assert!(!texts[1].contains("Office hours"));
        assert!(matches
            .iter()
            .all(|m| m.source == path.display().to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_reported() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, "%PDF-1.4 truncated")?;

        let index = Arc::new(InMemoryIndex::new());
        let ingestor = Ingestor::new(
            RecursiveCharacterSplitter::default(),
            Arc::new(FakeEmbedder::new()),
            index.clone(),
        );
        let err = ingestor.ingest_file(&path).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to extract text from"));
        assert!(index.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() -> Result<()> {
        let index = Arc::new(InMemoryIndex::new());
        let ingestor = Ingestor::new(
            RecursiveCharacterSplitter::default(),
            Arc::new(FakeEmbedder::failing()),
            index.clone(),
        );
        assert!(ingestor.ingest_text("a", "text").await.is_err());
        assert!(index.is_empty().await);
        Ok(())
    }
}
