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

//! `distinctTopNTvf`: a global top-N that spreads the result across groups.

use hashbrown::HashMap;
use itertools::Itertools;
use sqs_common::error::TvfResult;
use sqs_common::hash::{hash_rows, HashCode, PrecomputedBuildHasher};
use sqs_common::table::{RowId, Table};
use sqs_common::util::sort_util::{ComboComparator, FieldOrder};

use super::{BoxedTvfOperator, OnePassAlgorithm, OnePassTvf, TvfOperatorBuilder};
use crate::context::{TvfContext, TvfPhase};
use crate::params::{
    check_arity, parse_field_list, parse_limit, parse_limit_or, parse_required_sort_spec,
};

/// Distinct Top-N
///
/// Returns the best `total_limit` rows in sort order, taking at most `per_group_limit` rows from
/// each group while that is possible. When the groups cannot fill `total_limit` on their own, the
/// best rows over the cap backfill the shortfall.
#[derive(Debug)]
pub struct DistinctTopN {
    group_fields: Vec<String>,
    orders: Vec<FieldOrder>,
    total_limit: usize,
    /// 0 means no cap.
    per_group_limit: usize,
}

impl DistinctTopN {
    pub fn new(
        group_fields: Vec<String>,
        orders: Vec<FieldOrder>,
        total_limit: usize,
        per_group_limit: usize,
    ) -> Self {
        Self {
            group_fields,
            orders,
            total_limit,
            per_group_limit,
        }
    }

    fn select(&self, table: &Table) -> TvfResult<Vec<RowId>> {
        if self.total_limit == 0 {
            return Ok(vec![]);
        }
        let comparator = ComboComparator::new(table, &self.orders)?;
        let mut sorted = table.rows().to_vec();
        comparator.sort_rows(&mut sorted);

        if sorted.len() <= self.total_limit {
            return Ok(sorted);
        }
        if self.group_fields.is_empty() || self.per_group_limit == 0 {
            sorted.truncate(self.total_limit);
            return Ok(sorted);
        }

        let hashes = hash_rows(table, &self.group_fields, &sorted)?;
        let mut group_counts: HashMap<HashCode, usize, PrecomputedBuildHasher> =
            HashMap::default();
        let mut primary = Vec::with_capacity(self.total_limit);
        let mut backup = Vec::with_capacity(self.total_limit);
        for (&row_id, hash) in sorted.iter().zip_eq(hashes) {
            if primary.len() >= self.total_limit {
                break;
            }
            let count = group_counts.entry(hash).or_insert(0);
            if *count < self.per_group_limit {
                *count += 1;
                primary.push(row_id);
            } else if backup.len() < self.total_limit {
                backup.push(row_id);
            }
        }

        if primary.len() >= self.total_limit {
            return Ok(primary);
        }
        let deficit = self.total_limit - primary.len();
        backup.truncate(deficit);
        debug!(
            groups = group_counts.len(),
            primary = primary.len(),
            backfill = backup.len(),
            "distinct top-n backfill"
        );
        Ok(comparator.merge_sorted(&primary, &backup))
    }
}

impl OnePassAlgorithm for DistinctTopN {
    fn finalize(&mut self, mut table: Table) -> TvfResult<Option<Table>> {
        let rows = self.select(&table)?;
        table.set_rows(rows)?;
        Ok(Some(table))
    }
}

/// `distinctTopNTvf(groupFields, sortSpec, totalLimit, perGroupLimit, partTotalLimit,
/// partPerGroupLimit)`.
///
/// The first pair of limits applies in the final phase and the second in the partial phase. An
/// empty partial limit falls back to its final counterpart.
pub struct DistinctTopNTvfBuilder;

impl TvfOperatorBuilder for DistinctTopNTvfBuilder {
    fn new_boxed_operator(params: &[String], ctx: &TvfContext) -> TvfResult<BoxedTvfOperator> {
        check_arity("distinctTopNTvf", params, 6)?;
        let group_fields = parse_field_list(&params[0])?;
        let orders = parse_required_sort_spec(&params[1])?;
        let total_limit = parse_limit(&params[2])?;
        let per_group_limit = parse_limit(&params[3])?;
        let part_total_limit = parse_limit_or(&params[4], total_limit)?;
        let part_per_group_limit = parse_limit_or(&params[5], per_group_limit)?;

        let (total_limit, per_group_limit) = match ctx.phase() {
            TvfPhase::Partial => (part_total_limit, part_per_group_limit),
            TvfPhase::Final => (total_limit, per_group_limit),
        };
        let identity = format!(
            "DistinctTopNTvf({}, [{}], {total_limit}, {per_group_limit})",
            ctx.phase(),
            group_fields.iter().join(","),
        );
        let algorithm = DistinctTopN::new(group_fields, orders, total_limit, per_group_limit);
        Ok(Box::new(OnePassTvf::new(
            identity,
            algorithm,
            ctx.mem_ctx().clone(),
        )))
    }
}
