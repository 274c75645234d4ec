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

//! Quota based re-ranking: rows are matched to configured buckets, each bucket contributes up to
//! its quota, and an optional makeup pass fills any shortfall from the leftovers.

mod quota;
mod simple;
mod taobao_sp;

use hashbrown::HashMap;
use itertools::Itertools;
pub use quota::*;
pub use simple::*;
use sqs_common::error::{TvfError, TvfResult};
use sqs_common::hash::{hash_datums, hash_live_rows, HashCode, PrecomputedBuildHasher};
use sqs_common::table::{RowId, Table};
use sqs_common::types::ScalarImpl;
use sqs_common::util::sort_util::ComboComparator;
pub use taobao_sp::*;

use crate::params::{parse_field_list, parse_quota_targets};

/// The configured buckets: one literal tuple per bucket over the quota fields.
#[derive(Debug, Clone)]
pub struct QuotaBuckets {
    fields: Vec<String>,
    targets: Vec<Vec<String>>,
}

impl QuotaBuckets {
    /// Parses the quota field list and the `;` separated target tuples.
    pub fn parse(fields: &str, targets: &str) -> TvfResult<Self> {
        let fields = parse_field_list(fields)?;
        if fields.is_empty() {
            return Err(TvfError::config_error("quota fields must not be empty"));
        }
        let targets = parse_quota_targets(targets, fields.len())?;
        if targets.is_empty() {
            return Err(TvfError::config_error("quota targets must not be empty"));
        }
        Ok(Self { fields, targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Checks that `nums` gives one quota per bucket and that their total fits a `usize`.
    pub fn check_quota_nums(&self, nums: &[usize]) -> TvfResult<()> {
        if nums.len() != self.len() {
            return Err(TvfError::config_error(format!(
                "{} quota nums for {} quota targets",
                nums.len(),
                self.len()
            )));
        }
        if nums.iter().try_fold(0usize, |acc, &n| acc.checked_add(n)).is_none() {
            return Err(TvfError::config_error(format!(
                "quota nums {nums:?} sum beyond {}",
                usize::MAX
            )));
        }
        Ok(())
    }

    /// Hashes every target tuple the same way a row with those values hashes. Literals are parsed
    /// with the type of the column they are matched against.
    fn target_hashes(&self, table: &Table) -> TvfResult<Vec<HashCode>> {
        let data_types = self
            .fields
            .iter()
            .map(|field| {
                table
                    .column_index(field)
                    .map(|idx| &table.schema().fields[idx].data_type)
                    .ok_or_else(|| {
                        TvfError::group_key_error(format!("quota field `{field}` not found"))
                    })
            })
            .collect::<TvfResult<Vec<_>>>()?;

        self.targets
            .iter()
            .map(|tuple| {
                let values = tuple
                    .iter()
                    .zip_eq(&data_types)
                    .map(|(literal, data_type)| ScalarImpl::from_text(literal, data_type))
                    .collect::<TvfResult<Vec<_>>>()?;
                Ok(hash_datums(
                    values.iter().map(|v| Some(v.as_scalar_ref_impl())),
                ))
            })
            .collect()
    }

    /// Splits the live rows of `table` into one row list per bucket, in table order. Rows that
    /// match no bucket are left out. When two targets hash the same the first one gets the rows.
    pub fn split(&self, table: &Table) -> TvfResult<Vec<Vec<RowId>>> {
        let targets = self.target_hashes(table)?;
        let mut bucket_of: HashMap<HashCode, usize, PrecomputedBuildHasher> = HashMap::default();
        for (idx, hash) in targets.into_iter().enumerate() {
            bucket_of.entry(hash).or_insert(idx);
        }

        let hashes = hash_live_rows(table, &self.fields)?;
        let mut buckets = vec![vec![]; self.len()];
        let mut unmatched = 0;
        for (&row_id, hash) in table.rows().iter().zip_eq(hashes) {
            match bucket_of.get(&hash) {
                Some(&idx) => buckets[idx].push(row_id),
                None => unmatched += 1,
            }
        }
        if unmatched > 0 {
            debug!(unmatched, buckets = self.len(), "rows matching no quota bucket dropped");
        }
        Ok(buckets)
    }
}

/// Sorts the rows of every bucket. An empty comparator leaves them in table order.
fn sort_buckets(comparator: &ComboComparator<'_>, buckets: &mut [Vec<RowId>]) {
    for rows in buckets {
        comparator.sort_rows(rows);
    }
}

/// Concatenates the bucket targets and, if `need_makeup`, backfills up to `total_quota` rows from
/// `extra` in pool order.
fn makeup(
    targets: Vec<Vec<RowId>>,
    extra: Vec<RowId>,
    total_quota: usize,
    need_makeup: bool,
) -> Vec<RowId> {
    let mut rows = targets.into_iter().flatten().collect_vec();
    if need_makeup && rows.len() < total_quota {
        let deficit = total_quota - rows.len();
        debug!(
            selected = rows.len(),
            deficit,
            extra = extra.len(),
            "rerank makeup"
        );
        rows.extend(extra.into_iter().take(deficit));
    }
    rows
}

#[cfg(test)]
mod tests {
    use sqs_common::error::ErrorKind;
    use sqs_common::test_prelude::*;

    use super::*;
    use crate::test_utils::int64_values;

    #[test]
    fn test_split_by_typed_literals() {
        let table = Table::from_pretty(
            "id:I brand:T cat:i
             1    nike    1
             2    adidas  1
             3    nike    2
             4    puma    1
             5    nike    1",
        );
        let buckets = QuotaBuckets::parse("brand,cat", "nike,1;adidas,1;nike,2").unwrap();
        let split = buckets.split(&table).unwrap();
        let ids = split
            .iter()
            .map(|rows| int64_values(&table, "id", rows))
            .collect_vec();
        assert_eq!(ids, vec![vec![1, 5], vec![2], vec![3]]);
    }

    #[test]
    fn test_bad_buckets() {
        let err = QuotaBuckets::parse("brand,cat", "nike,1;adidas").unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::ConfigError(_)));
        assert!(QuotaBuckets::parse("", "x").is_err());

        let buckets = QuotaBuckets::parse("cat", "one").unwrap();
        let table = Table::from_pretty("cat:i\n1");
        let err = buckets.split(&table).unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::ConfigError(_)));

        let buckets = QuotaBuckets::parse("shop", "a").unwrap();
        let err = buckets.split(&table).unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::GroupKeyError(_)));
        assert!(buckets.check_quota_nums(&[1, 2]).is_err());

        let buckets = QuotaBuckets::parse("cat", "1;2").unwrap();
        let err = buckets.check_quota_nums(&[usize::MAX, 1]).unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::ConfigError(_)));
        buckets.check_quota_nums(&[usize::MAX - 1, 1]).unwrap();
    }

    #[test]
    fn test_makeup() {
        let r = |i| RowId::new(i).unwrap();
        let targets = vec![vec![r(0)], vec![r(1), r(2)]];
        let extra = vec![r(5), r(6), r(7)];
        assert_eq!(
            makeup(targets.clone(), extra.clone(), 5, true),
            vec![r(0), r(1), r(2), r(5), r(6)]
        );
        assert_eq!(makeup(targets, extra, 5, false), vec![r(0), r(1), r(2)]);
    }
}
