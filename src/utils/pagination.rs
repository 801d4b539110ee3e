use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Pieces of the Laravel-style paginator envelope `{data, links, meta}`.
/// Clients of the previous generation of this API depend on this exact
/// shape, field names included.
#[derive(Debug, Serialize, ToSchema)]
pub struct PageLinks {
    #[schema(example = "/api/customer-measurements?page=1")]
    pub first: String,
    #[schema(example = "/api/customer-measurements?page=4")]
    pub last: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PageMeta {
    #[schema(example = 1)]
    pub current_page: u64,
    pub from: Option<u64>,
    #[schema(example = 4)]
    pub last_page: u64,
    #[schema(example = 15)]
    pub per_page: u64,
    pub to: Option<u64>,
    #[schema(example = 52)]
    pub total: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Page number, 1-based
    pub page: Option<u64>,
    /// Items per page (max 100)
    pub per_page: Option<u64>,
    /// Free-text search term
    pub search: Option<String>,
}

impl PageQuery {
    /// Clamped (page, per_page, offset).
    pub fn resolve(&self) -> (u64, u64, u64) {
        let per_page = self.per_page.unwrap_or(15).clamp(1, 100);
        let page = self.page.unwrap_or(1).max(1);
        (page, per_page, (page - 1) * per_page)
    }
}

/// Links and meta for a result page holding `page_len` of `total` rows.
pub fn paginate(
    path: &str,
    page: u64,
    per_page: u64,
    total: i64,
    page_len: usize,
) -> (PageLinks, PageMeta) {
    let last_page = ((total.max(0) as u64).div_ceil(per_page)).max(1);

    let (from, to) = if page_len == 0 {
        (None, None)
    } else {
        let from = (page - 1) * per_page + 1;
        (Some(from), Some(from + page_len as u64 - 1))
    };

    let link = |p: u64| format!("{path}?page={p}");

    (
        PageLinks {
            first: link(1),
            last: link(last_page),
            prev: (page > 1).then(|| link(page - 1)),
            next: (page < last_page).then(|| link(page + 1)),
        },
        PageMeta {
            current_page: page,
            from,
            last_page,
            per_page,
            to,
            total,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_clamps_inputs() {
        let q = PageQuery {
            page: Some(0),
            per_page: Some(1000),
            search: None,
        };
        assert_eq!(q.resolve(), (1, 100, 0));

        let q = PageQuery {
            page: None,
            per_page: None,
            search: None,
        };
        assert_eq!(q.resolve(), (1, 15, 0));

        let q = PageQuery {
            page: Some(3),
            per_page: Some(10),
            search: None,
        };
        assert_eq!(q.resolve(), (3, 10, 20));
    }

    #[test]
    fn meta_for_a_middle_page() {
        let (links, meta) = paginate("/api/customer-measurements", 2, 15, 32, 15);
        assert_eq!(meta.last_page, 3);
        assert_eq!(meta.from, Some(16));
        assert_eq!(meta.to, Some(30));
        assert_eq!(links.prev.as_deref(), Some("/api/customer-measurements?page=1"));
        assert_eq!(links.next.as_deref(), Some("/api/customer-measurements?page=3"));
    }

    #[test]
    fn meta_for_empty_result() {
        let (links, meta) = paginate("/api/customer-measurements", 1, 15, 0, 0);
        assert_eq!(meta.last_page, 1);
        assert_eq!(meta.from, None);
        assert_eq!(meta.to, None);
        assert!(links.prev.is_none());
        assert!(links.next.is_none());
    }

    #[test]
    fn last_page_rounds_up() {
        let (_, meta) = paginate("/x", 1, 15, 31, 15);
        assert_eq!(meta.last_page, 3);
    }

    #[test]
    fn short_final_page_ends_at_total() {
        let (links, meta) = paginate("/x", 3, 15, 32, 2);
        assert_eq!(meta.from, Some(31));
        assert_eq!(meta.to, Some(32));
        assert!(links.next.is_none());
        assert_eq!(links.last, "/x?page=3");
    }
}
