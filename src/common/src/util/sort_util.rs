// Copyright 2025 RisingWave Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{TvfError, TvfResult};
use crate::table::{RowId, Table};
use crate::types::DatumRef;

#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash, Default)]
pub enum OrderType {
    #[default]
    Ascending,
    Descending,
}

impl OrderType {
    pub fn is_descending(&self) -> bool {
        *self == OrderType::Descending
    }
}

/// One entry of a sort spec: a field name and its direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldOrder {
    pub field: String,
    pub order_type: OrderType,
}

impl FieldOrder {
    pub fn new(field: impl Into<String>, order_type: OrderType) -> Self {
        Self {
            field: field.into(),
            order_type,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, OrderType::Ascending)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(field, OrderType::Descending)
    }
}

impl fmt::Display for FieldOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.order_type.is_descending() {
            '-'
        } else {
            '+'
        };
        write!(f, "{sign}{}", self.field)
    }
}

/// Compares two values of one column. Nulls are larger than any value, so they come last in
/// ascending order and first in descending order.
pub fn compare_datum(lhs: DatumRef<'_>, rhs: DatumRef<'_>, order_type: OrderType) -> Ordering {
    let ord = match (lhs, rhs) {
        (Some(l), Some(r)) => l.cmp(&r),
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
    };
    if order_type.is_descending() {
        ord.reverse()
    } else {
        ord
    }
}

/// Multi-field comparator over the rows of one table.
///
/// Fields are compared in order and the first difference decides. `Less` means "better", i.e.
/// earlier in the output.
#[derive(Clone)]
pub struct ComboComparator<'a> {
    table: &'a Table,
    columns: Vec<(usize, OrderType)>,
}

impl<'a> ComboComparator<'a> {
    /// Resolves `orders` against `table`. Fails if any field is absent.
    pub fn new(table: &'a Table, orders: &[FieldOrder]) -> TvfResult<Self> {
        let columns = orders
            .iter()
            .map(|order| {
                table
                    .column_index(&order.field)
                    .map(|idx| (idx, order.order_type))
                    .ok_or_else(|| {
                        TvfError::comparator_error(format!(
                            "sort field `{}` not found in {}",
                            order.field,
                            table.schema()
                        ))
                    })
            })
            .collect::<TvfResult<Vec<_>>>()?;
        Ok(Self { table, columns })
    }

    /// A comparator without fields considers all rows equal.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn compare(&self, lhs: RowId, rhs: RowId) -> Ordering {
        for &(col_idx, order_type) in &self.columns {
            let column = self.table.column_at(col_idx);
            let ord = compare_datum(
                column.datum_at(lhs.index()),
                column.datum_at(rhs.index()),
                order_type,
            );
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Stable sort, best rows first.
    pub fn sort_rows(&self, rows: &mut [RowId]) {
        if !self.is_empty() {
            rows.sort_by(|a, b| self.compare(*a, *b));
        }
    }

    /// Stable merge of two sorted row lists. On ties rows of `lhs` come first.
    pub fn merge_sorted(&self, lhs: &[RowId], rhs: &[RowId]) -> Vec<RowId> {
        let mut merged = Vec::with_capacity(lhs.len() + rhs.len());
        let (mut i, mut j) = (0, 0);
        while i < lhs.len() && j < rhs.len() {
            if self.compare(rhs[j], lhs[i]) == Ordering::Less {
                merged.push(rhs[j]);
                j += 1;
            } else {
                merged.push(lhs[i]);
                i += 1;
            }
        }
        merged.extend_from_slice(&lhs[i..]);
        merged.extend_from_slice(&rhs[j..]);
        merged
    }
}

impl fmt::Debug for ComboComparator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.columns.iter().map(|(idx, order_type)| {
                format!(
                    "{}{}",
                    if order_type.is_descending() { '-' } else { '+' },
                    self.table.schema().fields[*idx].name
                )
            }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;
    use crate::error::ErrorKind;
    use crate::table::TableTestExt;
    use crate::types::ScalarRefImpl;

    fn ids(table: &Table, rows: &[RowId]) -> Vec<i64> {
        let idx = table.column_index("id").unwrap();
        rows.iter()
            .map(|r| match table.value_at(*r, idx).unwrap() {
                Some(ScalarRefImpl::Int64(v)) => v,
                other => panic!("unexpected id {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_multi_field_order() {
        let table = Table::from_pretty(
            "id:I a:i b:T
             1    1   x
             2    2   y
             3    1   z
             4    .   a",
        );
        let cmp = ComboComparator::new(
            &table,
            &[FieldOrder::ascending("a"), FieldOrder::descending("b")],
        )
        .unwrap();
        let mut rows = table.rows().to_vec();
        cmp.sort_rows(&mut rows);
        assert_eq!(ids(&table, &rows), vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_descending_reverses_distinct_keys() {
        let table = Table::from_pretty(
            "id:I v:F
             5    6
             3    7
             2    8
             1    10
             4    9",
        );
        let asc = ComboComparator::new(&table, &[FieldOrder::ascending("v")]).unwrap();
        let desc = ComboComparator::new(&table, &[FieldOrder::descending("v")]).unwrap();
        let mut asc_rows = table.rows().to_vec();
        let mut desc_rows = table.rows().to_vec();
        asc.sort_rows(&mut asc_rows);
        desc.sort_rows(&mut desc_rows);
        assert_eq!(
            asc_rows,
            desc_rows.iter().rev().copied().collect_vec()
        );
        assert_eq!(ids(&table, &asc_rows), vec![5, 3, 2, 4, 1]);
    }

    #[test]
    fn test_ties_keep_arrival_order_in_both_directions() {
        let table = Table::from_pretty(
            "id:I v:i
             1    2
             2    .
             3    1
             4    2
             5    1",
        );
        let asc = ComboComparator::new(&table, &[FieldOrder::ascending("v")]).unwrap();
        let desc = ComboComparator::new(&table, &[FieldOrder::descending("v")]).unwrap();
        let mut asc_rows = table.rows().to_vec();
        let mut desc_rows = table.rows().to_vec();
        asc.sort_rows(&mut asc_rows);
        desc.sort_rows(&mut desc_rows);
        // the null flips ends, tied rows do not
        assert_eq!(ids(&table, &asc_rows), vec![3, 5, 1, 4, 2]);
        assert_eq!(ids(&table, &desc_rows), vec![2, 1, 4, 3, 5]);
    }

    #[test]
    fn test_multi_value_field() {
        let table = Table::from_pretty(
            "id:I tags:[i]
             1    2|1
             2    1|5
             3    1",
        );
        let cmp = ComboComparator::new(&table, &[FieldOrder::ascending("tags")]).unwrap();
        let mut rows = table.rows().to_vec();
        cmp.sort_rows(&mut rows);
        assert_eq!(ids(&table, &rows), vec![3, 2, 1]);
    }

    #[test]
    fn test_missing_field() {
        let table = Table::from_pretty("id:I\n1");
        let err = ComboComparator::new(&table, &[FieldOrder::ascending("score")]).unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::ComparatorError(_)));
    }

    #[test]
    fn test_merge_sorted_prefers_lhs_on_ties() {
        let table = Table::from_pretty(
            "id:I v:i
             1    1
             2    1
             3    0
             4    2",
        );
        let cmp = ComboComparator::new(&table, &[FieldOrder::ascending("v")]).unwrap();
        let rows = table.rows();
        let merged = cmp.merge_sorted(&[rows[0], rows[3]], &[rows[2], rows[1]]);
        assert_eq!(ids(&table, &merged), vec![3, 1, 2, 4]);
    }
}
