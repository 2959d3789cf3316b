//! Limit/offset pagination for list endpoints

/// Page size when the caller gives none
pub const DEFAULT_LIMIT: i64 = 50;

/// Largest page a caller may request
pub const MAX_LIMIT: i64 = 100;

/// Sanitized limit/offset pair for SQL `LIMIT ? OFFSET ?`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Clamp caller-supplied values into range
    ///
    /// # Examples
    /// ```
    /// use mpf_api::pagination::Page;
    ///
    /// let p = Page::new(Some(500), Some(-3));
    /// assert_eq!(p.limit, 100);
    /// assert_eq!(p.offset, 0);
    /// ```
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
