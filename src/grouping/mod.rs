//! Grouping projector
//!
//! Partitions an ordered result set by a group field. Multi-valued fields
//! fan a record out into every group it belongs to; records without a
//! value land in the `None` group. Every enumerable key appears, even with
//! zero records.

mod key;
mod projector;

pub use key::{GroupField, GroupKey, NONE_KEY};
pub use projector::{GroupProjection, GroupingProjector};
