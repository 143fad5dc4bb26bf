//! Ordering resolver
//!
//! Resolves `order_by` into a deterministic [`OrderingSpec`] and provides
//! the comparator stores use to apply it. The final `id ASC` term makes the
//! order strict, which offset pagination depends on.

mod comparator;
mod resolver;

pub use comparator::SortValue;
pub use resolver::{
    order_key_names, resolve_ordering, OrderingSpec, SortDirection, SortKey, SortTerm,
    DEFAULT_ORDER,
};
