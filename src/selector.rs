//! Result selection.
//!
//! Narrows a query's work records to the subset used in the output document:
//! threshold filters first, then ranking, then truncation.

use crate::openalex::WorkRecord;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// Filter and truncation options for [`select`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// Records cited fewer times than this are dropped
    pub min_citations: u64,
    /// Cap on the selected set; `None` keeps every survivor
    pub max_results: Option<usize>,
    /// Case-insensitive substring required in the title or abstract
    pub keyword: Option<String>,
}

/// Ranked subset of a query's records, most relevant first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectedSet {
    records: Vec<WorkRecord>,
}

impl SelectedSet {
    pub fn records(&self) -> &[WorkRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WorkRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a SelectedSet {
    type Item = &'a WorkRecord;
    type IntoIter = std::slice::Iter<'a, WorkRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Select the relevant records.
///
/// Ranking: citation count descending, then publication year descending,
/// then source ID ascending. Never fails; no match yields an empty set.
pub fn select(records: &[WorkRecord], criteria: &SelectionCriteria) -> SelectedSet {
    let keyword = criteria
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_lowercase);

    let mut survivors: Vec<&WorkRecord> = records
        .iter()
        .filter(|r| r.citations >= criteria.min_citations)
        .filter(|r| keyword.as_deref().map_or(true, |k| matches_keyword(r, k)))
        .collect();

    survivors.sort_by(|a, b| rank(a, b));

    let cap = criteria.max_results.unwrap_or(survivors.len());
    survivors.truncate(cap);

    debug!(
        input = records.len(),
        selected = survivors.len(),
        min_citations = criteria.min_citations,
        "Selected records"
    );

    SelectedSet {
        records: survivors.into_iter().cloned().collect(),
    }
}

fn matches_keyword(record: &WorkRecord, keyword: &str) -> bool {
    record.title.to_lowercase().contains(keyword)
        || record.abstract_text.to_lowercase().contains(keyword)
}

fn rank(a: &WorkRecord, b: &WorkRecord) -> Ordering {
    b.citations
        .cmp(&a.citations)
        .then_with(|| b.year.cmp(&a.year))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, citations: u64, year: i32) -> WorkRecord {
        WorkRecord {
            id: id.to_string(),
            title: format!("Paper {}", id),
            authors: vec!["Grace Hopper".to_string()],
            year,
            abstract_text: String::new(),
            citations,
            doi: None,
        }
    }

    fn ids(set: &SelectedSet) -> Vec<&str> {
        set.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_threshold_and_cap() {
        let records: Vec<WorkRecord> = [10, 0, 50, 3, 100]
            .iter()
            .enumerate()
            .map(|(i, c)| record(&format!("W{}", i), *c, 2020))
            .collect();
        let criteria = SelectionCriteria {
            min_citations: 5,
            max_results: Some(2),
            keyword: None,
        };

        let selected = select(&records, &criteria);
        let citations: Vec<u64> = selected.iter().map(|r| r.citations).collect();
        assert_eq!(citations, vec![100, 50]);
    }

    #[test]
    fn test_defaults_keep_everything_ranked() {
        let records = vec![record("W1", 1, 2020), record("W2", 7, 2019), record("W3", 4, 2021)];
        let selected = select(&records, &SelectionCriteria::default());
        assert_eq!(ids(&selected), vec!["W2", "W3", "W1"]);
    }

    #[test]
    fn test_tie_breaks() {
        let records = vec![
            record("W9", 5, 2018),
            record("W2", 5, 2022),
            record("W1", 5, 2018),
        ];
        let selected = select(&records, &SelectionCriteria::default());
        assert_eq!(ids(&selected), vec!["W2", "W1", "W9"]);
    }

    #[test]
    fn test_keyword_matches_title_or_abstract() {
        let mut in_abstract = record("W1", 1, 2020);
        in_abstract.abstract_text = "We study Message Passing on graphs".to_string();
        let mut in_title = record("W2", 2, 2020);
        in_title.title = "Neural message passing for chemistry".to_string();
        let neither = record("W3", 3, 2020);

        let criteria = SelectionCriteria {
            keyword: Some(" MESSAGE passing ".to_string()),
            ..SelectionCriteria::default()
        };
        let selected = select(&[in_abstract, in_title, neither], &criteria);
        assert_eq!(ids(&selected), vec!["W2", "W1"]);
    }

    #[test]
    fn test_blank_keyword_is_ignored() {
        let records = vec![record("W1", 1, 2020)];
        let criteria = SelectionCriteria {
            keyword: Some("  ".to_string()),
            ..SelectionCriteria::default()
        };
        assert_eq!(select(&records, &criteria).len(), 1);
    }

    #[test]
    fn test_empty_when_nothing_qualifies() {
        let records = vec![record("W1", 1, 2020)];
        let criteria = SelectionCriteria {
            min_citations: 10,
            ..SelectionCriteria::default()
        };
        assert!(select(&records, &criteria).is_empty());
        assert!(select(&[], &SelectionCriteria::default()).is_empty());
    }

    #[test]
    fn test_subset_bounded_and_deterministic() {
        let records: Vec<WorkRecord> = (0..20)
            .map(|i| record(&format!("W{:02}", i), (i * 7 % 5) as u64, 2000 + (i % 3)))
            .collect();
        let criteria = SelectionCriteria {
            min_citations: 1,
            max_results: Some(6),
            keyword: None,
        };

        let first = select(&records, &criteria);
        let second = select(&records, &criteria);
        assert_eq!(first, second);
        assert!(first.len() <= 6);
        assert!(first.iter().all(|r| records.contains(r)));
    }
}
