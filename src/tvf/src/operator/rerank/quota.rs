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

//! `rerankByQuotaTvf`: bucketed re-ranking with interleaved sub-groups and per-phase quotas.

use hashbrown::HashMap;
use itertools::Itertools;
use sqs_common::error::{TvfError, TvfResult};
use sqs_common::hash::{GroupKeyHasher, HashCode, PrecomputedBuildHasher};
use sqs_common::table::{RowId, Table};
use sqs_common::util::sort_util::{ComboComparator, FieldOrder};

use super::{makeup, QuotaBuckets};
use crate::context::{TvfContext, TvfPhase};
use crate::operator::{
    BoxedTvfOperator, OnePassAlgorithm, OnePassTvf, TopNHeap, TvfOperatorBuilder,
};
use crate::params::{
    check_arity, parse_bool, parse_field_list, parse_limit_list, parse_limit_or, parse_sort_spec,
};

/// Quota settings of one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseQuota {
    /// One quota per bucket.
    pub quota_nums: Vec<usize>,
    /// Rows one sub-group may contribute to its bucket. 0 means no cap.
    pub per_group_limit: usize,
    /// Candidates considered per draw round.
    pub window_size: usize,
    pub need_makeup: bool,
}

impl PhaseQuota {
    /// Parses `[quotaNums, perGroupLimit, windowSize, makeup]`. Empty entries take the value of
    /// `fallback` when given, or the defaults otherwise.
    fn parse(
        params: &[String],
        buckets: &QuotaBuckets,
        default_window_size: usize,
        fallback: Option<&PhaseQuota>,
    ) -> TvfResult<Self> {
        let quota_nums = match (params[0].trim(), fallback) {
            ("", Some(fallback)) => fallback.quota_nums.clone(),
            (nums, _) => parse_limit_list(nums)?,
        };
        buckets.check_quota_nums(&quota_nums)?;
        let per_group_limit =
            parse_limit_or(&params[1], fallback.map_or(0, |f| f.per_group_limit))?;
        let window_size = parse_limit_or(
            &params[2],
            fallback.map_or(default_window_size, |f| f.window_size),
        )?;
        if window_size == 0 {
            return Err(TvfError::config_error("window size must be positive"));
        }
        let need_makeup = match (params[3].trim(), fallback) {
            ("", Some(fallback)) => fallback.need_makeup,
            (s, _) => parse_bool(s)?,
        };
        Ok(Self {
            quota_nums,
            per_group_limit,
            window_size,
            need_makeup,
        })
    }

    pub fn total_quota(&self) -> usize {
        self.quota_nums.iter().sum()
    }
}

/// Fixed-quota re-rank.
///
/// Inside each bucket the rows are split into sub-groups over the rerank fields and drawn round
/// by round: each round every sub-group that is neither exhausted nor capped offers its best
/// remaining row, the best `window_size` offers are accepted in order until the bucket quota is
/// reached. This interleaves sub-groups instead of letting the strongest one fill the quota.
#[derive(Debug)]
pub struct RerankByQuota {
    buckets: QuotaBuckets,
    rerank_fields: Vec<String>,
    orders: Vec<FieldOrder>,
    quota: PhaseQuota,
}

impl RerankByQuota {
    pub fn new(
        buckets: QuotaBuckets,
        rerank_fields: Vec<String>,
        orders: Vec<FieldOrder>,
        quota: PhaseQuota,
    ) -> Self {
        Self {
            buckets,
            rerank_fields,
            orders,
            quota,
        }
    }

    /// Draws up to `quota` rows of one bucket. Returns the drawn rows and the leftovers.
    fn fill_bucket(
        &self,
        table: &Table,
        comparator: &ComboComparator<'_>,
        sub_group: &GroupKeyHasher,
        rows: &[RowId],
        quota: usize,
    ) -> TvfResult<(Vec<RowId>, Vec<RowId>)> {
        let hashes = sub_group.hash_rows(table, rows)?;
        let mut index: HashMap<HashCode, usize, PrecomputedBuildHasher> = HashMap::default();
        let mut groups: Vec<Vec<RowId>> = vec![];
        for (&row_id, hash) in rows.iter().zip_eq(hashes) {
            let idx = *index.entry(hash).or_insert_with(|| {
                groups.push(vec![]);
                groups.len() - 1
            });
            groups[idx].push(row_id);
        }
        for group in &mut groups {
            comparator.sort_rows(group);
        }

        let cap = match self.quota.per_group_limit {
            0 => usize::MAX,
            cap => cap,
        };
        // Rows drawn so far from each sub-group; also the position of its next candidate.
        let mut cursors = vec![0; groups.len()];
        let mut target = Vec::with_capacity(quota.min(rows.len()));
        while target.len() < quota {
            let mut window = TopNHeap::new(self.quota.window_size, comparator);
            for (idx, group) in groups.iter().enumerate() {
                let cursor = cursors[idx];
                if cursor < group.len() && cursor < cap {
                    window.push_tagged(group[cursor], idx);
                }
            }
            if window.is_empty() {
                break;
            }
            for (row_id, idx) in window.into_sorted_tagged() {
                if target.len() >= quota {
                    break;
                }
                target.push(row_id);
                cursors[idx] += 1;
            }
        }

        let extra = groups
            .iter()
            .zip_eq(&cursors)
            .flat_map(|(group, &cursor)| group[cursor..].iter().copied())
            .collect();
        Ok((target, extra))
    }

    fn select(&self, table: &Table) -> TvfResult<Vec<RowId>> {
        let buckets = self.buckets.split(table)?;
        let comparator = ComboComparator::new(table, &self.orders)?;
        let sub_group = GroupKeyHasher::new(table, &self.rerank_fields)?;

        let mut targets = Vec::with_capacity(buckets.len());
        let mut extra = vec![];
        for (rows, &quota) in buckets.iter().zip_eq(&self.quota.quota_nums) {
            let (target, rest) = self.fill_bucket(table, &comparator, &sub_group, rows, quota)?;
            targets.push(target);
            extra.extend(rest);
        }
        Ok(makeup(
            targets,
            extra,
            self.quota.total_quota(),
            self.quota.need_makeup,
        ))
    }
}

impl OnePassAlgorithm for RerankByQuota {
    fn finalize(&mut self, mut table: Table) -> TvfResult<Option<Table>> {
        let rows = self.select(&table)?;
        table.set_rows(rows)?;
        Ok(Some(table))
    }
}

/// `rerankByQuotaTvf(quotaFields, quotaTargets, rerankFields, sortSpec, partQuotaNums,
/// partPerGroupLimit, partWindowSize, partMakeup, finalQuotaNums, finalPerGroupLimit,
/// finalWindowSize, finalMakeup)`.
///
/// Empty partial-phase entries fall back to the final-phase ones.
pub struct RerankByQuotaTvfBuilder;

impl TvfOperatorBuilder for RerankByQuotaTvfBuilder {
    fn new_boxed_operator(params: &[String], ctx: &TvfContext) -> TvfResult<BoxedTvfOperator> {
        check_arity("rerankByQuotaTvf", params, 12)?;
        let buckets = QuotaBuckets::parse(&params[0], &params[1])?;
        let rerank_fields = parse_field_list(&params[2])?;
        let orders = parse_sort_spec(&params[3])?;
        let window_size = ctx.config().default_window_size;
        let final_quota = PhaseQuota::parse(&params[8..12], &buckets, window_size, None)?;
        let part_quota =
            PhaseQuota::parse(&params[4..8], &buckets, window_size, Some(&final_quota))?;

        let quota = match ctx.phase() {
            TvfPhase::Partial => part_quota,
            TvfPhase::Final => final_quota,
        };
        let identity = format!(
            "RerankByQuotaTvf({}, {:?}, window {})",
            ctx.phase(),
            quota.quota_nums,
            quota.window_size
        );
        let algorithm = RerankByQuota::new(buckets, rerank_fields, orders, quota);
        Ok(Box::new(OnePassTvf::new(
            identity,
            algorithm,
            ctx.mem_ctx().clone(),
        )))
    }
}
