//! Page range parsing
//!
//! Parses user-supplied page expressions such as `1-3, 5, every 2` into
//! groups of 1-based page numbers. Each comma-separated token becomes one
//! output group, except `every N` which partitions the whole document into
//! consecutive chunks of `N` pages.

use thiserror::Error;

/// Page range parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageRangeError {
    #[error("No page ranges given")]
    Empty,

    #[error("Invalid page number '{0}'")]
    InvalidNumber(String),

    #[error("Invalid range '{0}': start page is greater than end page")]
    Reversed(String),

    #[error("Invalid range '{0}': expected the form start-end")]
    MalformedRange(String),

    #[error("Page {page} in '{token}' is out of bounds (document has {page_count} pages)")]
    OutOfBounds {
        token: String,
        page: u32,
        page_count: u32,
    },

    #[error("Invalid chunk size in '{0}': expected a positive number of pages")]
    InvalidChunkSize(String),

    #[error("'{0}' is not allowed here")]
    ChunkNotAllowed(String),
}

/// One parsed token of a page expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelection {
    /// Inclusive 1-based range (a single page has `start == end`)
    Range { start: u32, end: u32 },
    /// Partition every page into chunks of this size
    Every(u32),
}

impl PageSelection {
    /// Expand into page groups for a document with `page_count` pages
    pub fn groups(&self, page_count: u32) -> Vec<Vec<u32>> {
        match *self {
            PageSelection::Range { start, end } => vec![(start..=end).collect()],
            PageSelection::Every(size) => (1..=page_count)
                .collect::<Vec<_>>()
                .chunks(size as usize)
                .map(<[u32]>::to_vec)
                .collect(),
        }
    }
}

/// Parse a single token, validating it against the page count
pub fn parse_token(token: &str, page_count: u32) -> Result<PageSelection, PageRangeError> {
    if let Some(size) = strip_every(token) {
        let size: u32 = size
            .trim()
            .parse()
            .map_err(|_| PageRangeError::InvalidChunkSize(token.to_string()))?;
        if size == 0 {
            return Err(PageRangeError::InvalidChunkSize(token.to_string()));
        }
        return Ok(PageSelection::Every(size));
    }

    if let Some((start, end)) = token.split_once('-') {
        let (start, end) = (start.trim(), end.trim());
        if start.is_empty() || end.is_empty() || end.contains('-') {
            return Err(PageRangeError::MalformedRange(token.to_string()));
        }
        let start = parse_page(start, token)?;
        let end = parse_page(end, token)?;
        if start > end {
            return Err(PageRangeError::Reversed(token.to_string()));
        }
        check_bounds(start, token, page_count)?;
        check_bounds(end, token, page_count)?;
        return Ok(PageSelection::Range { start, end });
    }

    let page = parse_page(token, token)?;
    check_bounds(page, token, page_count)?;
    Ok(PageSelection::Range {
        start: page,
        end: page,
    })
}

/// Parse a split expression into page groups, one per output document
pub fn parse_page_ranges(input: &str, page_count: u32) -> Result<Vec<Vec<u32>>, PageRangeError> {
    let mut groups = Vec::new();

    for token in tokens(input) {
        let selection = parse_token(token, page_count)?;
        groups.extend(selection.groups(page_count));
    }

    if groups.is_empty() {
        return Err(PageRangeError::Empty);
    }
    Ok(groups)
}

/// Parse a page order such as `3,1-2,4` into a flat list of pages.
///
/// Pages may repeat. `every N` is rejected since it has no meaning for an order.
pub fn parse_page_order(input: &str, page_count: u32) -> Result<Vec<u32>, PageRangeError> {
    let mut order = Vec::new();

    for token in tokens(input) {
        match parse_token(token, page_count)? {
            PageSelection::Every(_) => {
                return Err(PageRangeError::ChunkNotAllowed(token.to_string()))
            }
            PageSelection::Range { start, end } => order.extend(start..=end),
        }
    }

    if order.is_empty() {
        return Err(PageRangeError::Empty);
    }
    Ok(order)
}

fn tokens(input: &str) -> impl Iterator<Item = &str> {
    input.split(',').map(str::trim).filter(|token| !token.is_empty())
}

fn strip_every(token: &str) -> Option<&str> {
    let prefix = token.get(..5)?;
    if prefix.eq_ignore_ascii_case("every") {
        Some(&token[5..])
    } else {
        None
    }
}

fn parse_page(value: &str, token: &str) -> Result<u32, PageRangeError> {
    value
        .parse::<u32>()
        .map_err(|_| PageRangeError::InvalidNumber(token.to_string()))
}

fn check_bounds(page: u32, token: &str, page_count: u32) -> Result<(), PageRangeError> {
    if page == 0 || page > page_count {
        return Err(PageRangeError::OutOfBounds {
            token: token.to_string(),
            page,
            page_count,
        });
    }
    Ok(())
}
