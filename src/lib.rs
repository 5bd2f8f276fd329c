//! # rustpaper
//!
//! OpenAlex topic search to research-paper document generator.
//!
//! ## Modules
//!
//! - [`openalex`] - OpenAlex works-search client
//! - [`selector`] - Filtering and ranking of work records
//! - [`document`] - Document assembly and output formats
//! - [`pipeline`] - End-to-end run
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustpaper::openalex::{ClientConfig, OpenAlexClient, SearchQuery};
//! use rustpaper::selector::{select, SelectionCriteria};
//! use rustpaper::document::{assemble, write, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OpenAlexClient::new(ClientConfig::default())?;
//!     let records = client.search(&SearchQuery::new("graph neural networks", 5)?).await?;
//!     let selected = select(&records, &SelectionCriteria::default());
//!     let doc = assemble("Graph Neural Networks", &selected);
//!     write(&doc, "paper.md".as_ref(), OutputFormat::Markdown)?;
//!     Ok(())
//! }
//! ```

pub mod document;
pub mod error;
pub mod openalex;
pub mod pipeline;
pub mod selector;

pub use error::{ErrorKind, PaperError, Result};
