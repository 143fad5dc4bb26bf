//! Grouped paginator
//!
//! Offset pagination over a strictly ordered row set. In grouped mode every
//! group is paginated independently with the same cursor and carries its
//! own total and sub-count.

mod cursor;
mod paginator;

pub use cursor::{resolve_cursor, Cursor, PaginationConfig, DEFAULT_PER_PAGE, MAX_PER_PAGE};
pub use paginator::{paginate_flat, FlatPage, GroupPage, GroupedPage, GroupedPaginator};
