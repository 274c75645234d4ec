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

use itertools::Itertools;
use sqs_common::error::TvfResult;
use sqs_common::table::{RowId, Table};
use sqs_common::util::sort_util::{ComboComparator, FieldOrder};

use super::{sort_buckets, QuotaBuckets};
use crate::context::TvfContext;
use crate::operator::{BoxedTvfOperator, OnePassAlgorithm, OnePassTvf, TvfOperatorBuilder};
use crate::params::{check_arity, parse_limit_list, parse_sort_spec};

/// Resolves the quota each bucket actually gets.
///
/// `weights` are the nominal quotas; their sum is the number of rows to hand out. Each pass
/// splits what is left among the buckets that still have rows, proportionally to their weights,
/// with the last of them taking the rounding remainder. A bucket never gets more than it has.
/// Passes repeat until everything is handed out or a pass hands out nothing.
///
/// A weight sum beyond `usize::MAX` is clamped; [`TaobaoSpRerankTvfBuilder`] rejects such lists.
pub fn compute_actual_quotas(weights: &[usize], capacities: &[usize]) -> Vec<usize> {
    debug_assert_eq!(weights.len(), capacities.len());
    let mut remaining = capacities.to_vec();
    let mut quotas = vec![0; weights.len()];
    let mut left = weights.iter().fold(0usize, |acc, &w| acc.saturating_add(w));

    while left > 0 {
        let active = (0..weights.len())
            .filter(|&i| weights[i] > 0 && remaining[i] > 0)
            .collect_vec();
        let active_weight: u128 = active.iter().map(|&i| weights[i] as u128).sum();
        if active_weight == 0 {
            break;
        }

        let mut shared: usize = 0;
        let mut allocated = 0;
        for (pos, &i) in active.iter().enumerate() {
            let share = if pos + 1 == active.len() {
                left.saturating_sub(shared)
            } else {
                proportional_share(left, weights[i], active_weight)
            };
            shared = shared.saturating_add(share);
            let take = share.min(remaining[i]);
            quotas[i] += take;
            remaining[i] -= take;
            allocated += take;
        }

        if allocated == 0 {
            break;
        }
        left -= allocated;
    }
    quotas
}

/// `round(left * weight / total)`, half up. `weight <= total`, so the result never exceeds `left`.
fn proportional_share(left: usize, weight: usize, total: u128) -> usize {
    let product = left as u128 * weight as u128;
    let (quotient, rest) = (product / total, product % total);
    let rounded = if rest >= total - rest {
        quotient + 1
    } else {
        quotient
    };
    rounded.min(left as u128) as usize
}

/// Weighted dynamic re-rank: buckets that cannot fill their nominal quota pass the unused part
/// on to the others in proportion to their weights.
#[derive(Debug)]
pub struct TaobaoSpRerank {
    buckets: QuotaBuckets,
    weights: Vec<usize>,
    orders: Vec<FieldOrder>,
}

impl TaobaoSpRerank {
    pub fn new(buckets: QuotaBuckets, weights: Vec<usize>, orders: Vec<FieldOrder>) -> Self {
        Self {
            buckets,
            weights,
            orders,
        }
    }

    fn select(&self, table: &Table) -> TvfResult<Vec<RowId>> {
        let mut buckets = self.buckets.split(table)?;
        let comparator = ComboComparator::new(table, &self.orders)?;
        sort_buckets(&comparator, &mut buckets);

        let capacities = buckets.iter().map(Vec::len).collect_vec();
        let quotas = compute_actual_quotas(&self.weights, &capacities);
        debug!(?capacities, weights = ?self.weights, ?quotas, "quotas resolved");

        Ok(buckets
            .into_iter()
            .zip_eq(quotas)
            .flat_map(|(mut rows, quota)| {
                rows.truncate(quota);
                rows
            })
            .collect())
    }
}

impl OnePassAlgorithm for TaobaoSpRerank {
    fn finalize(&mut self, mut table: Table) -> TvfResult<Option<Table>> {
        let rows = self.select(&table)?;
        table.set_rows(rows)?;
        Ok(Some(table))
    }
}

/// `taobaoSpRerankTvf(quotaFields, quotaTargets, quotaNums, sortSpec)`.
pub struct TaobaoSpRerankTvfBuilder;

impl TvfOperatorBuilder for TaobaoSpRerankTvfBuilder {
    fn new_boxed_operator(params: &[String], ctx: &TvfContext) -> TvfResult<BoxedTvfOperator> {
        check_arity("taobaoSpRerankTvf", params, 4)?;
        let buckets = QuotaBuckets::parse(&params[0], &params[1])?;
        let weights = parse_limit_list(&params[2])?;
        buckets.check_quota_nums(&weights)?;
        let orders = parse_sort_spec(&params[3])?;

        let identity = format!("TaobaoSpRerankTvf({weights:?})");
        let algorithm = TaobaoSpRerank::new(buckets, weights, orders);
        Ok(Box::new(OnePassTvf::new(
            identity,
            algorithm,
            ctx.mem_ctx().clone(),
        )))
    }
}
