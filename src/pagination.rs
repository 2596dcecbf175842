// src/pagination.rs
use serde::Serialize;

/// Longest page list rendered without ellipses.
const FULL_WINDOW: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageToken {
    Page(usize),
    EllipsisLeft,
    EllipsisRight,
}

/// Number of pages needed for `total_items`, never less than one.
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    total_items.div_ceil(page_size).max(1)
}

/// Compresses the page list around `current_page`.
///
/// `total_pages == 0` yields an empty window; callers should pass at least 1.
pub fn page_window(total_pages: usize, current_page: usize) -> Vec<PageToken> {
    if total_pages <= FULL_WINDOW {
        return (1..=total_pages).map(PageToken::Page).collect();
    }

    let mut tokens = Vec::with_capacity(FULL_WINDOW);
    if current_page <= 4 {
        tokens.extend((1..=5).map(PageToken::Page));
        tokens.push(PageToken::EllipsisRight);
        tokens.push(PageToken::Page(total_pages));
    } else if current_page >= total_pages - 3 {
        tokens.push(PageToken::Page(1));
        tokens.push(PageToken::EllipsisLeft);
        tokens.extend((total_pages - 4..=total_pages).map(PageToken::Page));
    } else {
        tokens.push(PageToken::Page(1));
        tokens.push(PageToken::EllipsisLeft);
        tokens.extend((current_page - 1..=current_page + 1).map(PageToken::Page));
        tokens.push(PageToken::EllipsisRight);
        tokens.push(PageToken::Page(total_pages));
    }
    tokens
}
