//! Offset pagination for list endpoints

use serde::Deserialize;

/// Default page size for issue listings
pub const DEFAULT_LIMIT: i64 = 20;

/// Default page size for the admin user listing
pub const DEFAULT_USER_LIMIT: i64 = 100;

/// Largest page size a client may request
pub const MAX_LIMIT: i64 = 100;

/// `skip` / `limit` query parameters
///
/// Extracted as its own `Query` next to any endpoint filters; unknown keys
/// are ignored, so both extractors read the same query string.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub skip: i64,

    /// Absent means the endpoint's default page size
    pub limit: Option<i64>,
}

/// Sanitized window for SQL LIMIT/OFFSET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Rows to skip
    pub offset: i64,
    /// Rows per page
    pub limit: i64,
    /// 1-indexed page number, `offset / limit + 1`
    pub page: i64,
}

/// Clamp client-supplied paging to a valid window
///
/// Negative offsets become 0 and the limit is kept within `1..=MAX_LIMIT`.
///
/// # Examples
/// ```
/// use civic_api::pagination::calculate_pagination;
///
/// let p = calculate_pagination(40, 20);
/// assert_eq!(p.page, 3);
///
/// // Limit of zero is raised to one
/// let p = calculate_pagination(5, 0);
/// assert_eq!(p.limit, 1);
/// assert_eq!(p.page, 6);
/// ```
pub fn calculate_pagination(skip: i64, limit: i64) -> Pagination {
    let offset = skip.max(0);
    let limit = limit.clamp(1, MAX_LIMIT);

    Pagination {
        offset,
        limit,
        page: offset / limit + 1,
    }
}

impl PageParams {
    pub fn window(&self, default_limit: i64) -> Pagination {
        calculate_pagination(self.skip, self.limit.unwrap_or(default_limit))
    }
}
