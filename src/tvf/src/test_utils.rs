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

//! Helpers shared by operator tests.

use sqs_common::error::TvfResult;
use sqs_common::table::{RowId, Table};
use sqs_common::types::ScalarRefImpl;

use crate::operator::TvfOperator;

/// Reads a bigint column at `rows`. Panics on nulls or other kinds.
pub fn int64_values(table: &Table, column: &str, rows: &[RowId]) -> Vec<i64> {
    let idx = table
        .column_index(column)
        .unwrap_or_else(|| panic!("no column `{column}`"));
    rows.iter()
        .map(|&row_id| match table.value_at(row_id, idx) {
            Ok(Some(ScalarRefImpl::Int64(v))) => v,
            other => panic!("unexpected value {other:?} in `{column}`"),
        })
        .collect()
}

/// Reads a bigint column over the live rows, in table order.
pub fn live_int64_values(table: &Table, column: &str) -> Vec<i64> {
    int64_values(table, column, table.rows())
}

/// Reads a boolean column over the live rows, in table order.
pub fn live_bool_values(table: &Table, column: &str) -> Vec<bool> {
    let idx = table
        .column_index(column)
        .unwrap_or_else(|| panic!("no column `{column}`"));
    table
        .rows()
        .iter()
        .map(|&row_id| match table.value_at(row_id, idx) {
            Ok(Some(ScalarRefImpl::Bool(v))) => v,
            other => panic!("unexpected value {other:?} in `{column}`"),
        })
        .collect()
}

/// Feeds `batches` in order, flagging the last one as end of stream, and returns the output of
/// the last call.
pub fn run_to_end(
    tvf: &mut dyn TvfOperator,
    batches: impl IntoIterator<Item = Table>,
) -> TvfResult<Option<Table>> {
    let mut batches = batches.into_iter().peekable();
    let mut output = None;
    while let Some(batch) = batches.next() {
        let eof = batches.peek().is_none();
        output = tvf.compute(Some(batch), eof)?;
    }
    Ok(output)
}

/// Turns string literals into an owned parameter list.
pub fn params(params: &[&str]) -> Vec<String> {
    params.iter().map(|s| s.to_string()).collect()
}
