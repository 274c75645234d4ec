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

//! Per-partition top-K: `rankTvf` and `unorderRankTvf`.

use std::collections::HashSet;

use hashbrown::HashMap;
use itertools::Itertools;
use sqs_common::error::TvfResult;
use sqs_common::hash::{hash_live_rows, HashCode, PrecomputedBuildHasher};
use sqs_common::table::{RowId, Table};
use sqs_common::util::sort_util::{ComboComparator, FieldOrder};

use super::{select_top_n, BoxedTvfOperator, OnePassAlgorithm, OnePassTvf, TvfOperatorBuilder};
use crate::context::TvfContext;
use crate::params::{check_arity, parse_count, parse_field_list, parse_sort_spec};

/// Keeps the best `limit` rows of every partition.
///
/// `rankTvf` returns the kept rows in their original order. `unorderRankTvf` returns them
/// partition by partition, best first, with partitions in order of first appearance.
#[derive(Debug)]
pub struct Rank {
    partition_fields: Vec<String>,
    orders: Vec<FieldOrder>,
    limit: Option<usize>,
    keep_input_order: bool,
}

impl Rank {
    pub fn new(
        partition_fields: Vec<String>,
        orders: Vec<FieldOrder>,
        limit: Option<usize>,
        keep_input_order: bool,
    ) -> Self {
        Self {
            partition_fields,
            orders,
            limit,
            keep_input_order,
        }
    }

    fn partitions(&self, table: &Table) -> TvfResult<Vec<Vec<RowId>>> {
        if self.partition_fields.is_empty() {
            return Ok(vec![table.rows().to_vec()]);
        }
        let hashes = hash_live_rows(table, &self.partition_fields)?;
        let mut index: HashMap<HashCode, usize, PrecomputedBuildHasher> = HashMap::default();
        let mut partitions: Vec<Vec<RowId>> = vec![];
        for (&row_id, hash) in table.rows().iter().zip_eq(hashes) {
            let idx = *index.entry(hash).or_insert_with(|| {
                partitions.push(vec![]);
                partitions.len() - 1
            });
            partitions[idx].push(row_id);
        }
        Ok(partitions)
    }
}

impl OnePassAlgorithm for Rank {
    fn finalize(&mut self, mut table: Table) -> TvfResult<Option<Table>> {
        let rows = {
            let partitions = self.partitions(&table)?;
            let comparator = ComboComparator::new(&table, &self.orders)?;
            let selected = partitions
                .iter()
                .map(|rows| select_top_n(&comparator, rows, self.limit))
                .collect_vec();
            debug!(
                partitions = partitions.len(),
                kept = selected.iter().map(Vec::len).sum::<usize>(),
                "rank selected"
            );

            if self.keep_input_order {
                let kept: HashSet<RowId> = selected.into_iter().flatten().collect();
                table
                    .rows()
                    .iter()
                    .copied()
                    .filter(|r| kept.contains(r))
                    .collect_vec()
            } else {
                selected.into_iter().flatten().collect_vec()
            }
        };
        table.set_rows(rows)?;
        Ok(Some(table))
    }
}

fn build_rank(
    name: &str,
    params: &[String],
    ctx: &TvfContext,
    keep_input_order: bool,
) -> TvfResult<BoxedTvfOperator> {
    check_arity(name, params, 3)?;
    let partition_fields = parse_field_list(&params[0])?;
    let orders = parse_sort_spec(&params[1])?;
    let limit = parse_count(&params[2])?;
    let identity = format!(
        "{name}([{}], [{}], {})",
        partition_fields.iter().join(","),
        orders.iter().join(","),
        limit.map_or_else(|| "all".to_owned(), |k| k.to_string())
    );
    let algorithm = Rank::new(partition_fields, orders, limit, keep_input_order);
    Ok(Box::new(OnePassTvf::new(
        identity,
        algorithm,
        ctx.mem_ctx().clone(),
    )))
}

/// `rankTvf(partitionFields, sortSpec, count)`.
pub struct RankTvfBuilder;

impl TvfOperatorBuilder for RankTvfBuilder {
    fn new_boxed_operator(params: &[String], ctx: &TvfContext) -> TvfResult<BoxedTvfOperator> {
        build_rank("rankTvf", params, ctx, true)
    }
}

/// `unorderRankTvf(partitionFields, sortSpec, count)`.
pub struct UnorderRankTvfBuilder;

impl TvfOperatorBuilder for UnorderRankTvfBuilder {
    fn new_boxed_operator(params: &[String], ctx: &TvfContext) -> TvfResult<BoxedTvfOperator> {
        build_rank("unorderRankTvf", params, ctx, false)
    }
}

#[cfg(test)]
mod tests {
    use sqs_common::error::ErrorKind;
    use sqs_common::test_prelude::*;

    use super::*;
    use crate::context::TvfPhase;
    use crate::test_utils::{live_int64_values, params, run_to_end};

    fn input() -> Vec<Table> {
        vec![
            Table::from_pretty(
                "id:I shop:T sales:I
                 1    a      10
                 2    b      50
                 3    a      30",
            ),
            Table::from_pretty(
                "id:I shop:T sales:I
                 4    b      20
                 5    a      20
                 6    c      5
                 7    b      60",
            ),
        ]
    }

    fn run(builder: &str, p: &[&str]) -> TvfResult<Option<Table>> {
        let ctx = TvfContext::for_test(TvfPhase::Final);
        let mut tvf = match builder {
            "rank" => RankTvfBuilder::new_boxed_operator(&params(p), &ctx)?,
            _ => UnorderRankTvfBuilder::new_boxed_operator(&params(p), &ctx)?,
        };
        run_to_end(tvf.as_mut(), input())
    }

    #[test]
    fn test_rank_keeps_input_order() {
        let output = run("rank", &["shop", "-sales", "2"]).unwrap().unwrap();
        assert_eq!(live_int64_values(&output, "id"), vec![2, 3, 5, 6, 7]);

        let output = run("rank", &["shop", "-sales", "1"]).unwrap().unwrap();
        assert_eq!(live_int64_values(&output, "id"), vec![3, 6, 7]);
    }

    #[test]
    fn test_unorder_rank() {
        let output = run("unorder", &["shop", "-sales", "2"]).unwrap().unwrap();
        assert_eq!(live_int64_values(&output, "id"), vec![3, 5, 7, 2, 6]);
    }

    #[test]
    fn test_global_partition() {
        let output = run("rank", &["", "+sales", "3"]).unwrap().unwrap();
        assert_eq!(live_int64_values(&output, "id"), vec![1, 4, 6]);

        let output = run("rank", &["", "+sales", "-1"]).unwrap().unwrap();
        assert_eq!(output.row_count(), 7);
    }

    #[test]
    fn test_count_bound_per_partition() {
        let output = run("rank", &["shop", "-sales", "0"]).unwrap().unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_missing_fields() {
        let err = run("rank", &["region", "-sales", "2"]).unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::GroupKeyError(_)));

        let err = run("rank", &["shop", "-price", "2"]).unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::ComparatorError(_)));
    }
}
