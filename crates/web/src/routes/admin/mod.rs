//! Admin panel route handlers.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin),
//! which re-reads admin status from the database on each request.

pub mod analyses;
pub mod dashboard;
pub mod recommendations;
pub mod users;

use serde::Deserialize;

/// `?page=` on paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

impl PageQuery {
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

/// HTML checkboxes are only submitted when ticked.
pub(crate) fn checked(value: Option<&str>) -> bool {
    value.is_some()
}

/// Page links for a listing, carrying the active filters along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    pub page: u32,
    pub total_pages: u32,
    pub prev: Option<String>,
    pub next: Option<String>,
}

impl Pager {
    /// Build links under `base`, appending `query` (already encoded, may be
    /// empty) after the page number.
    #[must_use]
    pub fn new<T>(listing: &crate::db::Page<T>, base: &str, query: &str) -> Self {
        let link = |page: u32| {
            if query.is_empty() {
                format!("{base}?page={page}")
            } else {
                format!("{base}?page={page}&{query}")
            }
        };
        Self {
            page: listing.page,
            total_pages: listing.total_pages(),
            prev: listing.has_prev().then(|| link(listing.prev())),
            next: listing.has_next().then(|| link(listing.next())),
        }
    }
}
