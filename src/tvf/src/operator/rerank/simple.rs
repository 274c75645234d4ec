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

use super::{makeup, sort_buckets, QuotaBuckets};
use crate::context::TvfContext;
use crate::operator::{BoxedTvfOperator, OnePassAlgorithm, OnePassTvf, TvfOperatorBuilder};
use crate::params::{check_arity, parse_bool, parse_limit_list, parse_sort_spec};

/// Takes the first `quota` rows of every sorted bucket, then optionally backfills from the rest.
#[derive(Debug)]
pub struct SimpleRerank {
    buckets: QuotaBuckets,
    quota_nums: Vec<usize>,
    orders: Vec<FieldOrder>,
    need_makeup: bool,
}

impl SimpleRerank {
    pub fn new(
        buckets: QuotaBuckets,
        quota_nums: Vec<usize>,
        orders: Vec<FieldOrder>,
        need_makeup: bool,
    ) -> Self {
        Self {
            buckets,
            quota_nums,
            orders,
            need_makeup,
        }
    }

    fn select(&self, table: &Table) -> TvfResult<Vec<RowId>> {
        let mut buckets = self.buckets.split(table)?;
        let comparator = ComboComparator::new(table, &self.orders)?;
        sort_buckets(&comparator, &mut buckets);

        let mut targets = Vec::with_capacity(buckets.len());
        let mut extra = vec![];
        for (mut rows, &quota) in buckets.into_iter().zip_eq(&self.quota_nums) {
            let rest = rows.split_off(quota.min(rows.len()));
            targets.push(rows);
            extra.extend(rest);
        }
        Ok(makeup(
            targets,
            extra,
            self.quota_nums.iter().sum(),
            self.need_makeup,
        ))
    }
}

impl OnePassAlgorithm for SimpleRerank {
    fn finalize(&mut self, mut table: Table) -> TvfResult<Option<Table>> {
        let rows = self.select(&table)?;
        table.set_rows(rows)?;
        Ok(Some(table))
    }
}

/// `simpleRerankTvf(quotaFields, quotaTargets, quotaNums, sortSpec, needMakeup)`.
pub struct SimpleRerankTvfBuilder;

impl TvfOperatorBuilder for SimpleRerankTvfBuilder {
    fn new_boxed_operator(params: &[String], ctx: &TvfContext) -> TvfResult<BoxedTvfOperator> {
        check_arity("simpleRerankTvf", params, 5)?;
        let buckets = QuotaBuckets::parse(&params[0], &params[1])?;
        let quota_nums = parse_limit_list(&params[2])?;
        buckets.check_quota_nums(&quota_nums)?;
        let orders = parse_sort_spec(&params[3])?;
        let need_makeup = parse_bool(&params[4])?;

        let identity = format!("SimpleRerankTvf({quota_nums:?}, makeup {need_makeup})");
        let algorithm = SimpleRerank::new(buckets, quota_nums, orders, need_makeup);
        Ok(Box::new(OnePassTvf::new(
            identity,
            algorithm,
            ctx.mem_ctx().clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use sqs_common::test_prelude::*;

    use super::*;
    use crate::context::TvfPhase;
    use crate::test_utils::{params, run_to_end};

    fn run(p: &[&str]) -> Table {
        let input = Table::from_pretty(
            "id:I cat:i score:F
             1    1     0.3
             2    2     0.9
             3    1     0.8
             4    3     0.7
             5    1     0.5
             6    2     0.1",
        );
        let ctx = TvfContext::for_test(TvfPhase::Final);
        let mut tvf = SimpleRerankTvfBuilder::new_boxed_operator(&params(p), &ctx).unwrap();
        run_to_end(tvf.as_mut(), [input]).unwrap().unwrap()
    }

    #[test]
    fn test_simple_rerank() {
        expect![[r#"
            id:I cat:i score:F
            3 1 0.8
            5 1 0.5
            2 2 0.9"#]]
        .assert_eq(&run(&["cat", "1;2", "2,1", "-score", "false"]).to_pretty());
    }

    #[test]
    fn test_makeup_and_unsorted_buckets() {
        expect![[r#"
            id:I cat:i score:F
            1 1 0.3
            3 1 0.8
            2 2 0.9
            6 2 0.1
            5 1 0.5"#]]
        .assert_eq(&run(&["cat", "1;2", "2,3", "", "true"]).to_pretty());
    }
}
