//! Sort values and the ordering comparator

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::resolver::{OrderingSpec, SortDirection, SortTerm};

/// A comparable value extracted from a record for one sort term
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(DateTime<Utc>),
    Id(Uuid),
}

impl SortValue {
    fn type_rank(&self) -> u8 {
        match self {
            SortValue::Null => 0,
            SortValue::Int(_) => 1,
            SortValue::Float(_) => 2,
            SortValue::Text(_) => 3,
            SortValue::Date(_) => 4,
            SortValue::Time(_) => 5,
            SortValue::Id(_) => 6,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SortValue::Null)
    }
}

impl From<Option<NaiveDate>> for SortValue {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map_or(SortValue::Null, SortValue::Date)
    }
}

impl From<Option<String>> for SortValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(SortValue::Null, SortValue::Text)
    }
}

/// Natural ordering of two non-null values.
///
/// Mismatched types fall back to a fixed type rank so the result is
/// still total.
fn compare_values(a: &SortValue, b: &SortValue) -> Ordering {
    match (a, b) {
        (SortValue::Int(x), SortValue::Int(y)) => x.cmp(y),
        (SortValue::Float(x), SortValue::Float(y)) => x.total_cmp(y),
        (SortValue::Text(x), SortValue::Text(y)) => x.cmp(y),
        (SortValue::Date(x), SortValue::Date(y)) => x.cmp(y),
        (SortValue::Time(x), SortValue::Time(y)) => x.cmp(y),
        (SortValue::Id(x), SortValue::Id(y)) => x.cmp(y),
        _ => a.type_rank().cmp(&b.type_rank()),
    }
}

impl OrderingSpec {
    /// Compares two rows' extracted values term by term.
    ///
    /// Nulls sort last in either direction.
    pub fn compare(&self, a: &[SortValue], b: &[SortValue]) -> Ordering {
        for (term, (x, y)) in self.terms().iter().zip(a.iter().zip(b.iter())) {
            let ordering = match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let natural = compare_values(x, y);
                    match term.direction {
                        SortDirection::Asc => natural,
                        SortDirection::Desc => natural.reverse(),
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Sorts rows by this spec, extracting each term's value once per row
    pub fn sort_rows<T, F>(&self, rows: Vec<T>, mut value_of: F) -> Vec<T>
    where
        F: FnMut(&T, &SortTerm) -> SortValue,
    {
        let mut keyed: Vec<(Vec<SortValue>, T)> = rows
            .into_iter()
            .map(|row| {
                let values = self.terms().iter().map(|t| value_of(&row, t)).collect();
                (values, row)
            })
            .collect();

        keyed.sort_by(|(a, _), (b, _)| self.compare(a, b));
        keyed.into_iter().map(|(_, row)| row).collect()
    }
}
