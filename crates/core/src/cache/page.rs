//! Pagination shared by the history listings.

use serde::{Deserialize, Serialize};

use crate::Error;

pub const MAX_PAGE_LIMIT: usize = 100;

/// Page request with an optional keyword filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub keyword: Option<String>,
    pub page: usize,
    pub limit: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self { keyword: None, page: 1, limit: 10 }
    }
}

impl HistoryQuery {
    /// Rejects `page < 1` and `limit` outside `1..=100`.
    pub fn validate(&self) -> Result<(), Error> {
        if self.page < 1 {
            return Err(Error::InvalidInput("page must be at least 1".into()));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&self.limit) {
            return Err(Error::InvalidInput(format!("limit must be between 1 and {MAX_PAGE_LIMIT}")));
        }
        Ok(())
    }

    /// Case-insensitive substring match against the keyword, if any.
    pub fn matches(&self, haystack: &str) -> bool {
        match self.keyword.as_deref().map(str::trim) {
            Some(keyword) if !keyword.is_empty() => haystack.to_lowercase().contains(&keyword.to_lowercase()),
            _ => true,
        }
    }
}

/// Position of a page within a filtered listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// Slices `items` (already filtered and sorted) down to the requested page.
pub fn paginate<T>(items: Vec<T>, query: &HistoryQuery) -> (Vec<T>, Pagination) {
    let total_count = items.len();
    let total_pages = total_count.div_ceil(query.limit.max(1));
    let start = (query.page.saturating_sub(1)).saturating_mul(query.limit);

    let page: Vec<T> = items.into_iter().skip(start).take(query.limit).collect();

    let pagination = Pagination {
        total_count,
        current_page: query.page,
        total_pages,
        has_next_page: query.page < total_pages,
        has_previous_page: query.page > 1,
    };
    (page, pagination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bounds() {
        assert!(HistoryQuery::default().validate().is_ok());
        assert!(HistoryQuery { page: 0, ..Default::default() }.validate().is_err());
        assert!(HistoryQuery { limit: 0, ..Default::default() }.validate().is_err());
        assert!(HistoryQuery { limit: 101, ..Default::default() }.validate().is_err());
        assert!(HistoryQuery { limit: 100, ..Default::default() }.validate().is_ok());
    }

    #[test]
    fn test_keyword_is_case_insensitive() {
        let query = HistoryQuery { keyword: Some("CaT".into()), ..Default::default() };
        assert!(query.matches("black cats"));
        assert!(!query.matches("dogs"));
        assert!(HistoryQuery::default().matches("anything"));
    }

    #[test]
    fn test_paginate_middle_page() {
        let items: Vec<u32> = (1..=25).collect();
        let (page, info) = paginate(items, &HistoryQuery { keyword: None, page: 2, limit: 10 });

        assert_eq!(page, (11..=20).collect::<Vec<_>>());
        assert_eq!(info.total_count, 25);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_next_page);
        assert!(info.has_previous_page);
    }

    #[test]
    fn test_paginate_past_end() {
        let items: Vec<u32> = (1..=5).collect();
        let (page, info) = paginate(items, &HistoryQuery { keyword: None, page: 3, limit: 10 });

        assert!(page.is_empty());
        assert_eq!(info.total_pages, 1);
        assert!(!info.has_next_page);
        assert!(info.has_previous_page);
    }

    #[test]
    fn test_paginate_empty() {
        let (page, info) = paginate(Vec::<u32>::new(), &HistoryQuery::default());
        assert!(page.is_empty());
        assert_eq!(info.total_pages, 0);
        assert!(!info.has_next_page);
        assert!(!info.has_previous_page);
    }
}
