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

//! The row store operators work on.
//!
//! A [`Table`] owns its columns and keeps an ordered sequence of live rows. Each row is addressed
//! by a [`RowId`], a plain slot index that stays valid until the table is compacted. Filtering and
//! reordering only rewrite the live row sequence, the column data stays where it is.

use std::fmt;
use std::mem::size_of;

use itertools::Itertools;

use crate::array::ArrayImpl;
use crate::catalog::{Field, Schema};
use crate::error::{TvfError, TvfResult};
use crate::memory::{MemoryContext, MemoryContextRef};
use crate::types::{DataType, Datum, DatumRef, ScalarImpl};

/// Handle of one row inside the [`Table`] that produced it.
///
/// Handles of different tables must never be mixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u32);

/// Physical slots one table can address.
pub const MAX_SLOTS: usize = u32::MAX as usize;

impl RowId {
    /// Fails with `InvalidRowId` for a slot no table can address.
    pub fn new(slot: usize) -> TvfResult<Self> {
        match u32::try_from(slot) {
            Ok(id) if id < u32::MAX => Ok(Self(id)),
            _ => Err(TvfError::invalid_row_id(slot, MAX_SLOTS)),
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

pub struct Table {
    schema: Schema,
    columns: Vec<ArrayImpl>,
    /// Number of physical slots, shared by all columns.
    slots: usize,
    /// Live rows, in table order.
    rows: Vec<RowId>,
    mem_ctx: MemoryContextRef,
    /// Bytes currently charged to `mem_ctx`.
    charged_bytes: i64,
}

impl Table {
    /// Creates an empty table with the given columns.
    pub fn new(schema: Schema, mem_ctx: MemoryContextRef) -> Self {
        let columns = schema
            .fields
            .iter()
            .map(|f| ArrayImpl::new_nulls(&f.data_type, 0))
            .collect();
        let mut table = Self {
            schema,
            columns,
            slots: 0,
            rows: vec![],
            mem_ctx,
            charged_bytes: 0,
        };
        table.update_mem_usage();
        table
    }

    /// Builds a table from owned rows, one datum per field.
    pub fn from_rows(
        schema: Schema,
        rows: impl IntoIterator<Item = Vec<Datum>>,
        mem_ctx: MemoryContextRef,
    ) -> TvfResult<Self> {
        let mut table = Self::new(schema, mem_ctx);
        for row in rows {
            if row.len() != table.schema.len() {
                return Err(TvfError::config_error(format!(
                    "row has {} values, table has {} columns",
                    row.len(),
                    table.schema.len()
                )));
            }
            let row_id = RowId::new(table.slots)?;
            for (col_idx, datum) in row.into_iter().enumerate() {
                let column = &mut table.columns[col_idx];
                column
                    .as_dyn_mut()
                    .push_datum(datum)
                    .map_err(|v| type_mismatch(&table.schema.fields[col_idx], &v))?;
            }
            table.slots += 1;
            table.rows.push(row_id);
        }
        table.update_mem_usage();
        Ok(table)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn mem_ctx(&self) -> &MemoryContextRef {
        &self.mem_ctx
    }

    /// Number of live rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of physical slots, live or not.
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    pub fn rows(&self) -> &[RowId] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.index_of(name)
    }

    pub fn column_at(&self, idx: usize) -> &ArrayImpl {
        &self.columns[idx]
    }

    pub fn check_row_id(&self, row_id: RowId) -> TvfResult<()> {
        if row_id.index() < self.slots {
            Ok(())
        } else {
            Err(TvfError::invalid_row_id(row_id.index(), self.slots))
        }
    }

    pub fn value_at(&self, row_id: RowId, col_idx: usize) -> TvfResult<DatumRef<'_>> {
        self.check_row_id(row_id)?;
        Ok(self.columns[col_idx].datum_at(row_id.index()))
    }

    pub fn set_value(&mut self, row_id: RowId, col_idx: usize, datum: Datum) -> TvfResult<()> {
        self.check_row_id(row_id)?;
        self.columns[col_idx]
            .as_dyn_mut()
            .set_datum(row_id.index(), datum)
            .map_err(|v| type_mismatch(&self.schema.fields[col_idx], &v))?;
        self.update_mem_usage();
        Ok(())
    }

    /// Adds a column filled with nulls. Declaring an existing column with the same type returns
    /// its index.
    pub fn declare_column(&mut self, name: &str, data_type: DataType) -> TvfResult<usize> {
        if let Some(idx) = self.column_index(name) {
            let existing = &self.schema.fields[idx].data_type;
            if *existing != data_type {
                return Err(TvfError::type_mismatch(
                    name,
                    existing.to_string(),
                    data_type.to_string(),
                ));
            }
            return Ok(idx);
        }
        self.columns
            .push(ArrayImpl::new_nulls(&data_type, self.slots));
        self.schema.fields.push(Field::with_name(data_type, name));
        self.update_mem_usage();
        Ok(self.columns.len() - 1)
    }

    /// Appends `n` all-null rows to the end of the table and returns their handles.
    pub fn allocate_rows(&mut self, n: usize) -> TvfResult<Vec<RowId>> {
        self.check_capacity(n)?;
        let allocated: Vec<_> = (self.slots..self.slots + n).map(RowId::new).try_collect()?;
        for column in &mut self.columns {
            column.push_nulls(n);
        }
        self.slots += n;
        self.rows.extend_from_slice(&allocated);
        self.update_mem_usage();
        Ok(allocated)
    }

    /// Moves the live rows of `other` to the end of this table, keeping their order.
    ///
    /// Handles of `other` are not valid afterwards; the merged rows get fresh handles here.
    pub fn merge(&mut self, other: Table) -> TvfResult<()> {
        if self.schema != other.schema {
            return Err(TvfError::merge_error(format!(
                "incompatible schemas: {} vs {}",
                self.schema, other.schema
            )));
        }
        self.check_capacity(other.rows.len())?;
        let merged: Vec<_> = (self.slots..self.slots + other.rows.len())
            .map(RowId::new)
            .try_collect()?;
        let indices = other.rows.iter().map(|r| r.index()).collect_vec();
        for (column, other_column) in self.columns.iter_mut().zip_eq(&other.columns) {
            if !column.as_dyn_mut().append_from(other_column, &indices) {
                return Err(TvfError::merge_error(format!(
                    "column kind mismatch: {} vs {}",
                    column.get_ident(),
                    other_column.get_ident()
                )));
            }
        }
        self.rows.extend(merged);
        self.slots += indices.len();
        self.update_mem_usage();
        Ok(())
    }

    fn check_capacity(&self, extra: usize) -> TvfResult<()> {
        match self.slots.checked_add(extra) {
            Some(total) if total <= MAX_SLOTS => Ok(()),
            _ => Err(TvfError::invalid_row_id(
                self.slots.saturating_add(extra),
                MAX_SLOTS,
            )),
        }
    }

    /// Replaces the live row sequence. Rows not listed are dropped from the table's view.
    pub fn set_rows(&mut self, rows: Vec<RowId>) -> TvfResult<()> {
        if let Some(bad) = rows.iter().find(|r| r.index() >= self.slots) {
            return Err(TvfError::invalid_row_id(bad.index(), self.slots));
        }
        self.rows = rows;
        self.update_mem_usage();
        Ok(())
    }

    /// Keeps the first `len` live rows.
    pub fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }

    /// Rewrites the columns so that they hold exactly the live rows, in order. All handles are
    /// renumbered.
    pub fn compact(&mut self) {
        if self.rows.len() == self.slots && self.rows.iter().enumerate().all(|(i, r)| r.index() == i)
        {
            return;
        }
        let indices = self.rows.iter().map(|r| r.index()).collect_vec();
        for column in &mut self.columns {
            *column = column.take(&indices);
        }
        self.slots = indices.len();
        self.rows = (0u32..).take(self.slots).map(RowId).collect();
        self.update_mem_usage();
    }

    /// Compacts when dead slots outnumber live rows by more than `ratio`.
    pub fn compact_if_sparse(&mut self, ratio: usize) {
        if self.slots > ratio.max(1) * self.rows.len() {
            self.compact();
        }
    }

    pub fn estimated_heap_size(&self) -> usize {
        self.columns
            .iter()
            .map(ArrayImpl::estimated_heap_size)
            .sum::<usize>()
            + self.rows.capacity() * size_of::<RowId>()
    }

    fn update_mem_usage(&mut self) {
        let now = self.estimated_heap_size() as i64;
        self.mem_ctx.add(now - self.charged_bytes);
        self.charged_bytes = now;
    }

    /// Renders the live rows with a `name:type` header, one row per line. Nulls print as `.`.
    pub fn to_pretty(&self) -> String {
        let mut out = self
            .schema
            .fields
            .iter()
            .map(|f| format!("{}:{}", f.name, f.data_type.type_code()))
            .join(" ");
        for row_id in &self.rows {
            out.push('\n');
            let line = self
                .columns
                .iter()
                .map(|c| match c.datum_at(row_id.index()) {
                    Some(v) => v.to_string(),
                    None => ".".to_owned(),
                })
                .join(" ");
            out.push_str(&line);
        }
        out
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        self.mem_ctx.add(-self.charged_bytes);
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pretty())
    }
}

fn type_mismatch(field: &Field, value: &ScalarImpl) -> TvfError {
    TvfError::type_mismatch(
        field.name.as_str(),
        field.data_type.to_string(),
        value.data_type().to_string(),
    )
}

/// Test helpers for [`Table`].
pub trait TableTestExt: Sized {
    /// Parses a table from a literal.
    ///
    /// ```
    /// use sqs_common::table::{Table, TableTestExt};
    /// let table = Table::from_pretty(
    ///     "id:I score:F tags:[T]
    ///      1    0.5     a|b
    ///      2    .       c",
    /// );
    /// assert_eq!(table.row_count(), 2);
    ///
    /// // type codes:
    /// //     B: bool
    /// //     i: i32
    /// //     I: i64
    /// //     F: f64
    /// //     T: str
    /// //   [x]: multi-value of x, elements joined by `|`
    /// ```
    fn from_pretty(s: &str) -> Self;
}

impl TableTestExt for Table {
    fn from_pretty(s: &str) -> Self {
        let mut lines = s.split('\n').filter(|l| !l.trim().is_empty());
        let header = lines.next().expect("table literal needs a header");
        let schema = header
            .split_ascii_whitespace()
            .map(|col| {
                let (name, code) = col
                    .split_once(':')
                    .unwrap_or_else(|| panic!("column {col:?} should be `name:type`"));
                Field::with_name(DataType::from_type_code(code).unwrap(), name)
            })
            .collect::<Schema>();
        let rows = lines
            .map(|line| {
                line.split_ascii_whitespace()
                    .zip_eq(&schema.fields)
                    .map(|(token, field)| match token {
                        "." => None,
                        _ => Some(ScalarImpl::from_text(token, &field.data_type).unwrap()),
                    })
                    .collect_vec()
            })
            .collect_vec();
        Table::from_rows(schema, rows, MemoryContext::none()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;
    use crate::error::ErrorKind;
    use crate::types::ScalarRefImpl;

    #[test]
    fn test_from_pretty_and_render() {
        let table = Table::from_pretty(
            "id:I name:T tags:[i]
             1    a      1|2
             2    .      3",
        );
        expect![[r#"
            id:I name:T tags:[i]
            1 a 1|2
            2 . 3"#]]
        .assert_eq(&table.to_pretty());
    }

    #[test]
    fn test_merge_and_set_rows() {
        let mut table = Table::from_pretty(
            "id:I
             1
             2
             3",
        );
        table
            .set_rows(vec![RowId::new(2).unwrap(), RowId::new(0).unwrap()])
            .unwrap();
        let other = Table::from_pretty(
            "id:I
             4
             5",
        );
        table.merge(other).unwrap();
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.slot_count(), 5);
        expect![[r#"
            id:I
            3
            1
            4
            5"#]]
        .assert_eq(&table.to_pretty());

        table.compact();
        assert_eq!(table.slot_count(), 4);
        assert_eq!(
            table.value_at(RowId::new(0).unwrap(), 0).unwrap(),
            Some(ScalarRefImpl::Int64(3))
        );
    }

    #[test]
    fn test_merge_rejects_other_schema() {
        let mut table = Table::from_pretty("id:I\n1");
        let other = Table::from_pretty("id:T\na");
        let err = table.merge(other).unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::MergeError(_)));
    }

    #[test]
    fn test_declare_and_allocate() {
        let mut table = Table::from_pretty("id:I\n1\n2");
        let mark = table.declare_column("mark", DataType::Boolean).unwrap();
        assert_eq!(table.declare_column("mark", DataType::Boolean).unwrap(), mark);
        assert!(table.declare_column("mark", DataType::Int32).is_err());

        let rows = table.allocate_rows(1).unwrap();
        table.set_value(rows[0], 0, Some(9i64.into())).unwrap();
        table.set_value(rows[0], mark, Some(true.into())).unwrap();
        assert!(table.set_value(rows[0], mark, Some(1i64.into())).is_err());
        assert!(table.set_value(RowId::new(10).unwrap(), mark, None).is_err());
        expect![[r#"
            id:I mark:B
            1 .
            2 .
            9 t"#]]
        .assert_eq(&table.to_pretty());
    }

    #[test]
    fn test_row_id_range() {
        assert_eq!(RowId::new(MAX_SLOTS - 1).unwrap().index(), MAX_SLOTS - 1);
        let err = RowId::new(MAX_SLOTS).unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::InvalidRowId { .. }));
        assert!(RowId::new(usize::MAX).is_err());

        let mut table = Table::from_pretty("id:I\n1");
        let err = table.allocate_rows(MAX_SLOTS).unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::InvalidRowId { .. }));
        assert_eq!(table.slot_count(), 1);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_memory_accounting() {
        let ctx = MemoryContext::root();
        {
            let schema = Schema::new(vec![Field::with_name(DataType::Varchar, "s")]);
            let table = Table::from_rows(
                schema,
                vec![vec![Some("hello".into())], vec![Some("world".into())]],
                ctx.clone(),
            )
            .unwrap();
            assert_eq!(ctx.get_bytes_used(), table.estimated_heap_size() as i64);
            assert!(ctx.get_bytes_used() > 0);
        }
        assert_eq!(ctx.get_bytes_used(), 0);
    }
}
