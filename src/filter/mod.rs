//! Filter compiler
//!
//! Turns raw `field -> [tokens]` parameters into a typed [`Predicate`]:
//! AND across fields, OR across the values of one field. Every predicate
//! carries the implicit `draft == true` clause.
//!
//! Fields come from an explicit registry; anything outside it is a
//! validation error naming the offending parameter.

mod compiler;
mod predicate;
pub mod registry;

pub use compiler::{compile_filters, FilterCompiler, RawFilters};
pub use predicate::{Clause, DateRange, IssueFacts, Operand, Predicate};
pub use registry::{FieldSpec, FilterField, ValueKind};
