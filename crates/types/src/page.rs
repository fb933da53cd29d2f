//! Pagination helpers.

use serde::{Deserialize, Serialize};

/// A page request: 1-based page number plus page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Clamp the page number into `[1, total_pages]` the way the listing
    /// pages do: out-of-range requests land on the nearest valid page.
    pub fn clamp_to(&self, total: u64) -> Self {
        let total_pages = Page::<()>::page_count(total, self.per_page);
        Self {
            page: self.page.min(total_pages.max(1)),
            per_page: self.per_page,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, per_page: 25 }
    }
}

/// One page of results together with the totals needed to render pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
            total_pages: Self::page_count(total, request.per_page),
        }
    }

    pub fn page_count(total: u64, per_page: u32) -> u32 {
        total.div_ceil(per_page as u64) as u32
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(Page::<()>::page_count(0, 25), 0);
        assert_eq!(Page::<()>::page_count(25, 25), 1);
        assert_eq!(Page::<()>::page_count(26, 25), 2);
    }

    #[test]
    fn out_of_range_page_clamps_to_last() {
        let request = PageRequest::new(9, 10).clamp_to(25);
        assert_eq!(request.page, 3);

        // An empty result set still leaves the caller on page one.
        let request = PageRequest::new(4, 10).clamp_to(0);
        assert_eq!(request.page, 1);
    }
}
