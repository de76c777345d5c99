mod authors;
mod books;
mod external;
pub(crate) mod health_check;

pub use authors::*;
pub use books::*;
pub use external::*;
pub use health_check::*;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Standard pagination query parameters (`?page=&limit=`).
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PaginationParams {
    /// Page defaults to 1, limit to 10 and is clamped to 1..=100.
    pub fn normalize(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(10).clamp(1, 100);
        (page, limit)
    }
}

/// Row offset for a page, widened to i64 so that arbitrary client-supplied
/// page numbers cannot overflow before they reach the query.
pub(crate) fn page_offset(page: u32, limit: u32) -> i64 {
    (i64::from(page) - 1) * i64::from(limit)
}

/// Pagination block returned next to every collection, with absolute
/// next/previous URLs. `nextPage` always points one page further even past
/// the last page; `previousPage` never goes below page 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub next_page: String,
    pub previous_page: String,
    pub current_page: u32,
    pub number_of_pages: u32,
    pub limit: u32,
    pub total_items: i64,
}

impl Pagination {
    pub fn build(base_url: &str, path: &str, page: u32, limit: u32, total_items: i64) -> Self {
        let number_of_pages = ((total_items as f64) / (limit as f64)).ceil() as u32;
        Self {
            next_page: format!(
                "{}{}?page={}&limit={}",
                base_url,
                path,
                page.saturating_add(1),
                limit
            ),
            previous_page: format!(
                "{}{}?page={}&limit={}",
                base_url,
                path,
                page.saturating_sub(1).max(1),
                limit
            ),
            current_page: page,
            number_of_pages,
            limit,
            total_items,
        }
    }
}

pub(crate) async fn timeout_query<T, F>(
    duration: std::time::Duration,
    fut: F,
) -> Result<T, AppError>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(Ok(res)) => Ok(res),
        Ok(Err(e)) => Err(AppError::from(e)),
        Err(_) => Err(AppError::Database(anyhow::anyhow!(
            "Query timeout after {:?}",
            duration
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_normalize_with_defaults_and_clamping() {
        let params = PaginationParams {
            page: None,
            limit: None,
        };
        assert_eq!(params.normalize(), (1, 10));

        let params = PaginationParams {
            page: Some(0),
            limit: Some(500),
        };
        assert_eq!(params.normalize(), (1, 100));
    }

    #[test]
    fn pagination_links_and_page_count() {
        let p = Pagination::build("http://localhost:3001", "/api/books", 3, 10, 42);
        assert_eq!(p.next_page, "http://localhost:3001/api/books?page=4&limit=10");
        assert_eq!(
            p.previous_page,
            "http://localhost:3001/api/books?page=2&limit=10"
        );
        assert_eq!(p.number_of_pages, 5);
        assert_eq!(p.total_items, 42);
    }

    #[test]
    fn previous_page_never_goes_below_one() {
        let p = Pagination::build("http://localhost:3001", "/api/books", 1, 10, 42);
        assert_eq!(
            p.previous_page,
            "http://localhost:3001/api/books?page=1&limit=10"
        );
    }

    #[test]
    fn extreme_page_numbers_do_not_overflow() {
        let p = Pagination::build("http://localhost:3001", "/api/books", u32::MAX, 10, 42);
        assert_eq!(
            p.next_page,
            format!("http://localhost:3001/api/books?page={}&limit=10", u32::MAX)
        );

        assert_eq!(page_offset(u32::MAX, 100), (i64::from(u32::MAX) - 1) * 100);
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
    }

    #[test]
    fn empty_collection_has_zero_pages() {
        let p = Pagination::build("http://localhost:3001", "/api/authors", 1, 10, 0);
        assert_eq!(p.number_of_pages, 0);
    }
}
