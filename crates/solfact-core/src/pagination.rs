//! Pagination for query results.
//!
//! Dispatch layers window large result sets; the core provides one
//! consistent implementation so `total_count`/`has_more` semantics never
//! drift between operations.

use serde::Serialize;
use thiserror::Error;

/// Invalid pagination parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    /// A limit of zero can never return anything.
    #[error("limit must be >= 1")]
    ZeroLimit,
}

/// One window of a larger result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of items before windowing.
    pub total_count: usize,
    /// True if items exist beyond this window.
    pub has_more: bool,
}

/// Apply `offset`/`limit` windowing to a result list.
///
/// `limit: None` means no limit. An offset past the end yields an empty
/// page with `has_more = false`.
pub fn paginate<T>(items: Vec<T>, offset: usize, limit: Option<usize>) -> Result<Page<T>, PageError> {
    if limit == Some(0) {
        return Err(PageError::ZeroLimit);
    }
    let total_count = items.len();
    let windowed: Vec<T> = items
        .into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    let has_more = offset + windowed.len() < total_count;
    Ok(Page {
        items: windowed,
        total_count,
        has_more,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_limit_returns_everything() {
        let page = paginate(vec![1, 2, 3], 0, None).unwrap();
        assert_eq!(page.items, vec![1, 2, 3]);
        assert_eq!(page.total_count, 3);
        assert!(!page.has_more);
    }

    #[test]
    fn limit_windows_and_flags_more() {
        let page = paginate(vec![1, 2, 3, 4], 0, Some(2)).unwrap();
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.total_count, 4);
        assert!(page.has_more);
    }

    #[test]
    fn offset_skips_from_the_front() {
        let page = paginate(vec![1, 2, 3, 4], 2, Some(2)).unwrap();
        assert_eq!(page.items, vec![3, 4]);
        assert!(!page.has_more);
    }

    #[test]
    fn offset_past_end_is_empty_not_an_error() {
        let page = paginate(vec![1, 2], 10, None).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 2);
        assert!(!page.has_more);
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert_eq!(paginate(vec![1], 0, Some(0)).unwrap_err(), PageError::ZeroLimit);
    }

    #[test]
    fn middle_window_has_more() {
        let page = paginate(vec![1, 2, 3, 4, 5], 1, Some(2)).unwrap();
        assert_eq!(page.items, vec![2, 3]);
        assert!(page.has_more);
    }
}
