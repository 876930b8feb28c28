//! List pagination contract.
//!
//! Every list endpoint accepts `page` (>= 1) and `pageSize` (clamped to
//! the configured maximum) and wraps its data in the same envelope.

use serde::Deserialize;
use serde_json::{json, Value};

pub const DEFAULT_PAGE_SIZE: u64 = 20;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// Resolved, clamped paging window.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u64,
    pub page_size: u64,
}

impl Page {
    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.page_size
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

pub fn resolve(params: &PageParams, max_page_size: u64) -> Page {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, max_page_size);
    Page { page, page_size }
}

/// Wrap a page of data in the pagination envelope.
pub fn envelope(data: Value, page: &Page, total: u64) -> Value {
    let total_pages = if total == 0 {
        0
    } else {
        total.div_ceil(page.page_size)
    };
    json!({
        "data": data,
        "pagination": {
            "page": page.page,
            "pageSize": page.page_size,
            "total": total,
            "totalPages": total_pages,
            "hasNextPage": page.page < total_pages,
            "hasPreviousPage": page.page > 1 && total_pages > 0,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_defaults_and_floors() {
        let page = resolve(&PageParams::default(), 100);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, DEFAULT_PAGE_SIZE);

        let zeroed = resolve(
            &PageParams {
                page: Some(0),
                page_size: Some(0),
            },
            100,
        );
        assert_eq!(zeroed.page, 1);
        assert_eq!(zeroed.page_size, 1);
    }

    #[test]
    fn resolve_clamps_page_size_to_configured_max() {
        let page = resolve(
            &PageParams {
                page: Some(3),
                page_size: Some(5_000),
            },
            100,
        );
        assert_eq!(page.page, 3);
        assert_eq!(page.page_size, 100);
        assert_eq!(page.skip(), 200);
    }

    #[test]
    fn envelope_reports_navigation_flags() {
        let page = Page {
            page: 2,
            page_size: 10,
        };
        let body = envelope(json!([]), &page, 35);
        let pagination = &body["pagination"];
        assert_eq!(pagination["total"], 35);
        assert_eq!(pagination["totalPages"], 4);
        assert_eq!(pagination["hasNextPage"], true);
        assert_eq!(pagination["hasPreviousPage"], true);
    }

    #[test]
    fn envelope_empty_result_has_no_pages() {
        let page = Page {
            page: 1,
            page_size: 10,
        };
        let body = envelope(json!([]), &page, 0);
        let pagination = &body["pagination"];
        assert_eq!(pagination["totalPages"], 0);
        assert_eq!(pagination["hasNextPage"], false);
        assert_eq!(pagination["hasPreviousPage"], false);
    }

    #[test]
    fn envelope_exact_multiple_has_no_phantom_page() {
        let page = Page {
            page: 3,
            page_size: 10,
        };
        let body = envelope(json!([]), &page, 30);
        assert_eq!(body["pagination"]["totalPages"], 3);
        assert_eq!(body["pagination"]["hasNextPage"], false);
    }
}
