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

//! Global bounded top-K: `sortTvf`, `topKTvf` and `topKMarkTvf`.

use std::collections::HashSet;

use itertools::Itertools;
use sqs_common::error::TvfResult;
use sqs_common::table::{RowId, Table};
use sqs_common::types::DataType;
use sqs_common::util::sort_util::{ComboComparator, FieldOrder};

use super::{
    select_top_n, select_top_n_unordered, BoxedTvfOperator, OnePassAlgorithm, OnePassTvf,
    TvfOperatorBuilder,
};
use crate::context::TvfContext;
use crate::params::{check_arity, parse_count, parse_required_sort_spec};

/// How the selected rows are returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopKOutput {
    /// Selected rows in sort order.
    Sorted,
    /// Selected rows in arrival order.
    Unordered,
    /// All rows, with a boolean column telling whether the row was selected. Selected rows come
    /// first in sort order, the rest follow in arrival order.
    Mark { field: String },
}

/// Keeps the best `limit` rows of the whole input.
///
/// With a limit and outside mark mode, every merge shrinks the accumulated table back to the
/// current best rows, so the working set stays bounded by `limit` plus one batch.
#[derive(Debug)]
pub struct TopK {
    orders: Vec<FieldOrder>,
    /// `None` keeps every row.
    limit: Option<usize>,
    output: TopKOutput,
    compaction_ratio: usize,
}

impl TopK {
    pub fn new(
        orders: Vec<FieldOrder>,
        limit: Option<usize>,
        output: TopKOutput,
        compaction_ratio: usize,
    ) -> Self {
        Self {
            orders,
            limit,
            output,
            compaction_ratio,
        }
    }

    fn mark(&self, mut table: Table, field: &str) -> TvfResult<Table> {
        let selected = {
            let comparator = ComboComparator::new(&table, &self.orders)?;
            select_top_n(&comparator, table.rows(), self.limit)
        };
        let mark_idx = table.declare_column(field, DataType::Boolean)?;
        let selected_set: HashSet<RowId> = selected.iter().copied().collect();
        let rest = table
            .rows()
            .iter()
            .copied()
            .filter(|r| !selected_set.contains(r))
            .collect_vec();
        for &row_id in &selected {
            table.set_value(row_id, mark_idx, Some(true.into()))?;
        }
        for &row_id in &rest {
            table.set_value(row_id, mark_idx, Some(false.into()))?;
        }
        table.set_rows(selected.into_iter().chain(rest).collect())?;
        Ok(table)
    }
}

impl OnePassAlgorithm for TopK {
    fn on_merge(&mut self, table: &mut Table) -> TvfResult<()> {
        if matches!(self.output, TopKOutput::Mark { .. }) || self.limit.is_none() {
            return Ok(());
        }
        let kept = {
            let comparator = ComboComparator::new(table, &self.orders)?;
            select_top_n_unordered(&comparator, table.rows(), self.limit)
        };
        table.set_rows(kept)?;
        table.compact_if_sparse(self.compaction_ratio);
        Ok(())
    }

    fn finalize(&mut self, mut table: Table) -> TvfResult<Option<Table>> {
        if let TopKOutput::Mark { field } = &self.output {
            return self.mark(table, field).map(Some);
        }
        let rows = {
            let comparator = ComboComparator::new(&table, &self.orders)?;
            if self.output == TopKOutput::Sorted {
                select_top_n(&comparator, table.rows(), self.limit)
            } else {
                select_top_n_unordered(&comparator, table.rows(), self.limit)
            }
        };
        table.set_rows(rows)?;
        Ok(Some(table))
    }
}

fn build_top_k(
    name: &str,
    params: &[String],
    ctx: &TvfContext,
    output: TopKOutput,
) -> TvfResult<BoxedTvfOperator> {
    let orders = parse_required_sort_spec(&params[0])?;
    let limit = parse_count(&params[1])?;
    let identity = format!(
        "{name}({}, {})",
        orders.iter().join(","),
        limit.map_or_else(|| "all".to_owned(), |k| k.to_string())
    );
    let algorithm = TopK::new(orders, limit, output, ctx.config().compaction_ratio);
    Ok(Box::new(OnePassTvf::new(
        identity,
        algorithm,
        ctx.mem_ctx().clone(),
    )))
}

/// `sortTvf(sortSpec, count)`: the best `count` rows in sort order.
pub struct SortTvfBuilder;

impl TvfOperatorBuilder for SortTvfBuilder {
    fn new_boxed_operator(params: &[String], ctx: &TvfContext) -> TvfResult<BoxedTvfOperator> {
        check_arity("sortTvf", params, 2)?;
        build_top_k("SortTvf", params, ctx, TopKOutput::Sorted)
    }
}

/// `topKTvf(sortSpec, count)`: the best `count` rows in arrival order.
pub struct TopKTvfBuilder;

impl TvfOperatorBuilder for TopKTvfBuilder {
    fn new_boxed_operator(params: &[String], ctx: &TvfContext) -> TvfResult<BoxedTvfOperator> {
        check_arity("topKTvf", params, 2)?;
        build_top_k("TopKTvf", params, ctx, TopKOutput::Unordered)
    }
}

/// `topKMarkTvf(sortSpec, count, markField)`: every row, marked by membership in the best
/// `count`.
pub struct TopKMarkTvfBuilder;

impl TvfOperatorBuilder for TopKMarkTvfBuilder {
    fn new_boxed_operator(params: &[String], ctx: &TvfContext) -> TvfResult<BoxedTvfOperator> {
        check_arity("topKMarkTvf", params, 3)?;
        let field = match params[2].trim() {
            "" => ctx.config().topk_mark_field.clone(),
            field => field.to_owned(),
        };
        build_top_k("TopKMarkTvf", params, ctx, TopKOutput::Mark { field })
    }
}
