//! Page cursors and page-size limits

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// Hard upper bound on page size
pub const MAX_PER_PAGE: usize = 1000;

/// Page size used when neither cursor nor `per_page` is given
pub const DEFAULT_PER_PAGE: usize = 100;

/// Page-size policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_per_page")]
    pub default_per_page: usize,
    #[serde(default = "max_per_page")]
    pub max_per_page: usize,
}

fn default_per_page() -> usize {
    DEFAULT_PER_PAGE
}

fn max_per_page() -> usize {
    MAX_PER_PAGE
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: MAX_PER_PAGE,
        }
    }
}

impl PaginationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_per_page == 0 || self.max_per_page > MAX_PER_PAGE {
            return Err(format!("max_per_page must be between 1 and {}", MAX_PER_PAGE));
        }
        if self.default_per_page == 0 || self.default_per_page > self.max_per_page {
            return Err("default_per_page must be between 1 and max_per_page".to_string());
        }
        Ok(())
    }
}

/// Position in a paginated result: `"{per_page}:{page}:{is_prev}"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub per_page: usize,
    pub page: usize,
    /// Set on cursors handed out as `prev_cursor`
    pub is_prev: bool,
}

impl Cursor {
    pub fn first(per_page: usize) -> Self {
        Self {
            per_page,
            page: 0,
            is_prev: false,
        }
    }

    pub fn parse(raw: &str) -> QueryResult<Self> {
        let invalid = || QueryError::validation("cursor", format!("malformed cursor: {}", raw));
        let parts: Vec<&str> = raw.trim().split(':').collect();
        let [per_page, page, is_prev] = parts.as_slice() else {
            return Err(invalid());
        };

        let per_page: usize = per_page.parse().map_err(|_| invalid())?;
        let page: usize = page.parse().map_err(|_| invalid())?;
        let is_prev = match *is_prev {
            "0" | "false" => false,
            "1" | "true" => true,
            _ => return Err(invalid()),
        };

        Ok(Self {
            per_page,
            page,
            is_prev,
        })
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.per_page)
    }

    pub fn following(&self) -> Cursor {
        Cursor {
            per_page: self.per_page,
            page: self.page + 1,
            is_prev: false,
        }
    }

    /// Cursor of the following page, if `total` rows leave one
    pub fn next(&self, total: usize) -> Option<Cursor> {
        let end = self.offset().saturating_add(self.per_page);
        (end < total).then(|| self.following())
    }

    pub fn prev(&self) -> Option<Cursor> {
        (self.page > 0).then(|| Cursor {
            per_page: self.per_page,
            page: self.page - 1,
            is_prev: true,
        })
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.per_page, self.page, u8::from(self.is_prev))
    }
}

/// Resolves the request's cursor and `per_page` into one validated cursor.
///
/// The cursor's own page size wins over `per_page`.
pub fn resolve_cursor(
    config: &PaginationConfig,
    cursor: Option<&str>,
    per_page: Option<&str>,
) -> QueryResult<Cursor> {
    let (source, cursor) = match cursor.map(str::trim).filter(|c| !c.is_empty()) {
        Some(raw) => ("cursor", Cursor::parse(raw)?),
        None => {
            let size = match per_page.map(str::trim).filter(|p| !p.is_empty()) {
                Some(raw) => raw.parse::<usize>().map_err(|_| {
                    QueryError::validation("per_page", format!("not a number: {}", raw))
                })?,
                None => config.default_per_page,
            };
            ("per_page", Cursor::first(size))
        }
    };

    if cursor.per_page == 0 || cursor.per_page > config.max_per_page {
        return Err(QueryError::validation(
            source,
            format!("must be between 1 and {}", config.max_per_page),
        ));
    }
    Ok(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_text_form() {
        let cursor = Cursor::parse("100:2:0").unwrap();
        assert_eq!(cursor.offset(), 200);
        assert_eq!(cursor.to_string(), "100:2:0");
        assert_eq!(cursor.prev().unwrap().to_string(), "100:1:1");
    }

    #[test]
    fn test_malformed_cursor() {
        for raw in ["", "100", "100:a:0", "100:1:2", "1:2:3:4"] {
            let err = Cursor::parse(raw).unwrap_err();
            assert_eq!(err.field(), Some("cursor"), "{}", raw);
        }
    }

    #[test]
    fn test_next_stops_at_end() {
        let cursor = Cursor::first(2);
        assert_eq!(cursor.next(5).unwrap().page, 1);
        assert!(Cursor { page: 2, ..cursor }.next(5).is_none());
        assert!(cursor.next(2).is_none());
        assert!(cursor.prev().is_none());
    }

    #[test]
    fn test_resolve_defaults_and_limits() {
        let config = PaginationConfig::default();
        assert_eq!(resolve_cursor(&config, None, None).unwrap(), Cursor::first(100));
        assert_eq!(resolve_cursor(&config, None, Some("25")).unwrap(), Cursor::first(25));
        assert_eq!(
            resolve_cursor(&config, Some("10:3:0"), Some("25")).unwrap().per_page,
            10
        );

        let err = resolve_cursor(&config, None, Some("1001")).unwrap_err();
        assert_eq!(err.field(), Some("per_page"));
        assert!(resolve_cursor(&config, Some("0:0:0"), None).is_err());
    }

    #[test]
    fn test_oversized_cursor_names_cursor() {
        let config = PaginationConfig::default();
        let err = resolve_cursor(&config, Some("5000:0:0"), Some("10")).unwrap_err();
        assert_eq!(err.field(), Some("cursor"));
    }

    #[test]
    fn test_config_validation() {
        assert!(PaginationConfig::default().validate().is_ok());
        let bad = PaginationConfig {
            default_per_page: 500,
            max_per_page: 100,
        };
        assert!(bad.validate().is_err());
    }
}
