//! Search → select → assemble → write.
//!
//! The single entry operation of the crate. Stages run in order; outputs are
//! staged first and any error aborts the run before the document is in place.

use crate::document::{self, Document, OutputFormat};
use crate::error::Result;
use crate::openalex::{OpenAlexClient, SearchQuery};
use crate::selector::{self, SelectionCriteria};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything one run needs besides the client handle.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub query: SearchQuery,
    pub criteria: SelectionCriteria,
    /// Document title; the topic when unset
    pub title: Option<String>,
    pub output: PathBuf,
    pub format: OutputFormat,
    /// Optional CSV export of the selected records
    pub records_csv: Option<PathBuf>,
}

/// Run the pipeline and return the document that was written.
pub async fn run(client: &OpenAlexClient, request: &PipelineRequest) -> Result<Document> {
    info!(topic = request.query.topic(), "Stage 1: OpenAlex search");
    let records = client.search(&request.query).await?;

    info!(found = records.len(), "Stage 2: selecting records");
    let selected = selector::select(&records, &request.criteria);
    info!(selected = selected.len(), "Selection complete");

    let title = request
        .title
        .as_deref()
        .unwrap_or_else(|| request.query.topic());
    let doc = document::assemble(title, &selected);

    info!(output = %request.output.display(), format = ?request.format, "Stage 3: writing document");
    let staged_doc = document::stage(&doc, &request.output, request.format)?;
    let staged_csv = request
        .records_csv
        .as_deref()
        .map(|path| document::stage_records_csv(selected.records(), path))
        .transpose()?;

    // The document lands last so a failed export never leaves it behind.
    if let Some(csv) = staged_csv {
        csv.commit()?;
    }
    staged_doc.commit()?;

    Ok(doc)
}

/// `research_paper_<timestamp>.<ext>` inside `dir`
pub fn default_output_path(dir: &Path, format: OutputFormat) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("research_paper_{}.{}", timestamp, format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openalex::ClientConfig;
    use crate::ErrorKind;
    use mockito::Matcher;
    use serde_json::json;
    use tempfile::tempdir;

    fn work(id: &str, citations: u64) -> serde_json::Value {
        json!({
            "id": id,
            "title": format!("Paper {}", id),
            "publication_year": 2020,
            "cited_by_count": citations,
            "authorships": [{"author": {"display_name": "Yoshua Bengio"}}]
        })
    }

    async fn serve(body: serde_json::Value) -> (mockito::ServerGuard, OpenAlexClient) {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;
        let client = OpenAlexClient::new(ClientConfig {
            base_url: server.url(),
            ..ClientConfig::default()
        })
        .unwrap();
        (server, client)
    }

    fn request(output: PathBuf, criteria: SelectionCriteria) -> PipelineRequest {
        PipelineRequest {
            query: SearchQuery::new("graph neural networks", 5).unwrap(),
            criteria,
            title: None,
            format: OutputFormat::from_path(&output),
            output,
            records_csv: None,
        }
    }

    #[tokio::test]
    async fn test_run_selects_top_cited() {
        let body = json!({
            "results": [work("W1", 10), work("W2", 0), work("W3", 50), work("W4", 3), work("W5", 100)]
        });
        let (_server, client) = serve(body).await;
        let dir = tempdir().unwrap();
        let output = dir.path().join("paper.md");
        let criteria = SelectionCriteria {
            min_citations: 5,
            max_results: Some(2),
            keyword: None,
        };

        let doc = run(&client, &request(output.clone(), criteria)).await.unwrap();

        assert_eq!(doc.title, "graph neural networks");
        let headings: Vec<&str> = doc.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["Paper W5", "Paper W3"]);
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.starts_with("# graph neural networks"));
        assert!(content.contains("- Yoshua Bengio (2020). Paper W5."));
    }

    #[tokio::test]
    async fn test_run_with_no_results_writes_title_only() {
        let (_server, client) = serve(json!({"results": []})).await;
        let dir = tempdir().unwrap();
        let output = dir.path().join("paper.txt");
        let mut req = request(output.clone(), SelectionCriteria::default());
        req.title = Some("Nothing Found".to_string());
        req.records_csv = Some(dir.path().join("records.csv"));

        let doc = run(&client, &req).await.unwrap();

        assert!(doc.sections.is_empty());
        assert!(doc.bibliography.is_empty());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "Nothing Found\n\nReferences\n\n");
    }

    #[tokio::test]
    async fn test_run_export_failure_leaves_no_document() {
        let (_server, client) = serve(json!({"results": [work("W1", 10)]})).await;
        let dir = tempdir().unwrap();
        let output = dir.path().join("paper.txt");
        let mut req = request(output.clone(), SelectionCriteria::default());
        req.records_csv = Some(dir.path().join("missing").join("records.csv"));

        let err = run(&client, &req).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Write);
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_writes_document_and_records() {
        let (_server, client) = serve(json!({"results": [work("W1", 10), work("W2", 20)]})).await;
        let dir = tempdir().unwrap();
        let output = dir.path().join("paper.docx");
        let csv_path = dir.path().join("records.csv");
        let mut req = request(output.clone(), SelectionCriteria::default());
        req.records_csv = Some(csv_path.clone());

        let doc = run(&client, &req).await.unwrap();

        assert_eq!(req.format, OutputFormat::Docx);
        assert_eq!(doc.sections.len(), 2);
        assert!(std::fs::read(&output).unwrap().starts_with(b"PK"));
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.lines().nth(1).unwrap().starts_with("W2,"));
    }

    #[tokio::test]
    async fn test_run_upstream_failure_writes_nothing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        let client = OpenAlexClient::new(ClientConfig {
            base_url: server.url(),
            ..ClientConfig::default()
        })
        .unwrap();
        let dir = tempdir().unwrap();
        let output = dir.path().join("paper.txt");

        let err = run(&client, &request(output.clone(), SelectionCriteria::default()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(!output.exists());
    }

    #[test]
    fn test_default_output_path() {
        let path = default_output_path(Path::new("out"), OutputFormat::Markdown);
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(path.starts_with("out"));
        assert!(name.starts_with("research_paper_"));
        assert!(name.ends_with(".md"));
        assert_eq!(name.len(), "research_paper_20240101_120000.md".len());
    }
}
