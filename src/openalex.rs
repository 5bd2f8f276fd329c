//! OpenAlex API Client
//!
//! Runs one works-search request per call and decodes the response into typed
//! [`WorkRecord`]s. Decoding fails fast on missing required fields.
//!
//! API notes (per OpenAlex docs):
//! - Use the `mailto` parameter for the polite pool (10 req/s vs 1 req/s)
//! - `per-page` tops out at 200
//! - Abstracts are only published as an inverted index

use crate::error::{OptionExt, PaperError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

/// OpenAlex API base URL
pub const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// Maximum results per page (OpenAlex limit)
pub const MAX_PER_PAGE: usize = 200;

/// Result count used when the caller does not pick one
pub const DEFAULT_LIMIT: usize = 5;

/// Fields requested from the works endpoint
const SELECT_FIELDS: &str =
    "id,doi,title,display_name,authorships,cited_by_count,publication_year,abstract_inverted_index";

/// Connection settings for the OpenAlex client.
///
/// Built once per run and handed to [`OpenAlexClient::new`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, without the `/works` path
    pub base_url: String,
    /// Contact email for the polite pool
    pub mailto: Option<String>,
    /// Whole-request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: OPENALEX_API_BASE.to_string(),
            mailto: None,
            timeout: Duration::from_secs(15),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// A topic search with its result cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    topic: String,
    limit: usize,
}

impl SearchQuery {
    /// Create a query, rejecting a blank topic or a limit outside `1..=200`.
    pub fn new(topic: impl Into<String>, limit: usize) -> Result<Self> {
        let topic = topic.into().trim().to_string();
        if topic.is_empty() {
            return Err(PaperError::Validation("topic must not be empty".to_string()));
        }
        if limit == 0 || limit > MAX_PER_PAGE {
            return Err(PaperError::Validation(format!(
                "limit must be between 1 and {}, got {}",
                MAX_PER_PAGE, limit
            )));
        }
        Ok(Self { topic, limit })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// One paper's metadata as decoded from OpenAlex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRecord {
    /// OpenAlex work ID (e.g. `https://openalex.org/W2741809807`)
    pub id: String,
    pub title: String,
    /// Author display names in authorship order
    pub authors: Vec<String>,
    pub year: i32,
    /// Plain-text abstract, empty when OpenAlex has none
    pub abstract_text: String,
    pub citations: u64,
    /// DOI without the `https://doi.org/` prefix
    pub doi: Option<String>,
}

/// OpenAlex API response structures
#[derive(Debug, Deserialize)]
struct OpenAlexResponse {
    #[serde(default)]
    meta: Option<OpenAlexMeta>,
    results: Vec<OpenAlexWork>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexMeta {
    count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexWork {
    id: Option<String>,
    title: Option<String>,
    display_name: Option<String>,
    publication_year: Option<i32>,
    doi: Option<String>,
    cited_by_count: Option<u64>,
    abstract_inverted_index: Option<BTreeMap<String, Vec<usize>>>,
    authorships: Option<Vec<OpenAlexAuthorship>>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexAuthorship {
    author: Option<OpenAlexAuthor>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexAuthor {
    display_name: Option<String>,
}

/// Handle on the OpenAlex works endpoint.
#[derive(Debug, Clone)]
pub struct OpenAlexClient {
    client: Client,
    config: ClientConfig,
}

impl OpenAlexClient {
    /// Build the HTTP client from `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        url::Url::parse(&config.base_url)
            .map_err(|e| PaperError::Config(format!("Invalid base URL {:?}: {}", config.base_url, e)))?;

        let user_agent = match &config.mailto {
            Some(email) => format!("{} (mailto:{})", config.user_agent, email),
            None => config.user_agent.clone(),
        };

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| PaperError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Search OpenAlex for works matching the query topic.
    ///
    /// Sends exactly one request and does not retry. Records keep upstream
    /// order; at most `query.limit()` are returned and IDs are distinct.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<WorkRecord>> {
        let url = build_search_url(&self.config, query);

        info!(topic = query.topic(), limit = query.limit(), "Starting OpenAlex query");
        debug!(url = %url, "Fetching OpenAlex works");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!(status = status.as_u16(), "OpenAlex request failed");
            return Err(PaperError::Status {
                code: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown status").to_string(),
            });
        }

        let body = response.text().await?;
        let works = parse_response(&body)?;

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(works.len().min(query.limit()));
        for work in works {
            if records.len() == query.limit() {
                break;
            }
            if !seen.insert(work.id.clone()) {
                warn!(id = %work.id, "Dropping duplicate OpenAlex work");
                continue;
            }
            records.push(work);
        }

        info!(total = records.len(), "OpenAlex query complete");
        Ok(records)
    }
}

/// Build OpenAlex API search URL
fn build_search_url(config: &ClientConfig, query: &SearchQuery) -> String {
    let mut url = format!(
        "{}/works?search={}&per-page={}&select={}",
        config.base_url.trim_end_matches('/'),
        urlencoding::encode(query.topic()),
        query.limit(),
        SELECT_FIELDS
    );

    if let Some(email) = &config.mailto {
        url.push_str(&format!("&mailto={}", urlencoding::encode(email)));
    }

    url
}

/// Parse OpenAlex API response
fn parse_response(json_str: &str) -> Result<Vec<WorkRecord>> {
    let response: OpenAlexResponse = serde_json::from_str(json_str)
        .map_err(|e| PaperError::Parse(format!("Failed to parse OpenAlex response: {}", e)))?;

    if let Some(count) = response.meta.and_then(|m| m.count) {
        debug!(count = count, "OpenAlex reported total matches");
    }

    response
        .results
        .into_iter()
        .enumerate()
        .map(|(idx, work)| parse_work(work).map_err(|e| match e {
            PaperError::Parse(msg) => PaperError::Parse(format!("work #{}: {}", idx, msg)),
            other => other,
        }))
        .collect()
}

fn parse_work(work: OpenAlexWork) -> Result<WorkRecord> {
    let id = work
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_parse("missing id")?;

    let title = work
        .display_name
        .or(work.title)
        .filter(|t| !t.trim().is_empty())
        .ok_or_parse(&format!("{}: missing title", id))?;

    let year = work
        .publication_year
        .ok_or_parse(&format!("{}: missing publication_year", id))?;

    let citations = work
        .cited_by_count
        .ok_or_parse(&format!("{}: missing cited_by_count", id))?;

    let authors = work
        .authorships
        .ok_or_parse(&format!("{}: missing authorships", id))?
        .into_iter()
        .filter_map(|a| a.author)
        .filter_map(|a| a.display_name)
        .collect();

    let abstract_text = work
        .abstract_inverted_index
        .as_ref()
        .map(reconstruct_abstract)
        .unwrap_or_default();

    let doi = work
        .doi
        .map(|d| d.trim_start_matches("https://doi.org/").to_string())
        .filter(|d| !d.is_empty());

    Ok(WorkRecord {
        id,
        title,
        authors,
        year,
        abstract_text,
        citations,
        doi,
    })
}

/// Reconstruct abstract text from inverted index.
/// OpenAlex provides abstracts as word -> positions for legal reasons.
fn reconstruct_abstract(inverted_index: &BTreeMap<String, Vec<usize>>) -> String {
    let mut words: Vec<(usize, &str)> = inverted_index
        .iter()
        .flat_map(|(word, positions)| positions.iter().map(move |p| (*p, word.as_str())))
        .collect();

    words.sort_by_key(|(pos, _)| *pos);
    words.iter().map(|(_, w)| *w).collect::<Vec<_>>().join(" ")
}
