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

//! Group keys: one combined hash over a list of fields, used to bucket and partition rows.
//!
//! The hash is order sensitive: `(a, b)` and `(b, a)` hash differently. It is only ever used to
//! group rows, never to decide equality, so collisions merge two groups but cannot duplicate or
//! lose rows.

use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};

use twox_hash::XxHash64;

use crate::error::{TvfError, TvfResult};
use crate::table::{RowId, Table};
use crate::types::DatumRef;

pub type XxHash64Builder = BuildHasherDefault<XxHash64>;

/// Hash of one group key.
pub type HashCode = u64;

/// Hashes a sequence of values. Rows whose values are equal field by field hash identically,
/// whether the values come from a table or from parsed literals.
pub fn hash_datums<'a>(datums: impl IntoIterator<Item = DatumRef<'a>>) -> HashCode {
    let mut hasher = XxHash64Builder::default().build_hasher();
    for datum in datums {
        datum.hash(&mut hasher);
    }
    hasher.finish()
}

/// Computes group keys over a fixed list of fields of one table.
#[derive(Debug, Clone)]
pub struct GroupKeyHasher {
    column_indices: Vec<usize>,
}

impl GroupKeyHasher {
    pub fn new(table: &Table, fields: &[String]) -> TvfResult<Self> {
        let column_indices = table.schema().indices_of(fields).map_err(|missing| {
            TvfError::group_key_error(format!("group field `{missing}` not found"))
        })?;
        Ok(Self { column_indices })
    }

    /// An empty field list puts every row into one group.
    pub fn is_empty(&self) -> bool {
        self.column_indices.is_empty()
    }

    pub fn hash_row(&self, table: &Table, row_id: RowId) -> HashCode {
        hash_datums(
            self.column_indices
                .iter()
                .map(|&idx| table.column_at(idx).datum_at(row_id.index())),
        )
    }

    pub fn hash_rows(&self, table: &Table, rows: &[RowId]) -> TvfResult<Vec<HashCode>> {
        let mut hashes = Vec::with_capacity(rows.len());
        for &row_id in rows {
            table.check_row_id(row_id)?;
            hashes.push(self.hash_row(table, row_id));
        }
        Ok(hashes)
    }
}

/// Hashes `rows` of `table` over `fields`.
pub fn hash_rows(table: &Table, fields: &[String], rows: &[RowId]) -> TvfResult<Vec<HashCode>> {
    GroupKeyHasher::new(table, fields)?.hash_rows(table, rows)
}

/// Hashes all live rows of `table` and checks that every row got exactly one key.
pub fn hash_live_rows(table: &Table, fields: &[String]) -> TvfResult<Vec<HashCode>> {
    let hashes = hash_rows(table, fields, table.rows())?;
    if hashes.len() != table.row_count() {
        return Err(TvfError::group_key_error(format!(
            "computed {} group keys for {} rows",
            hashes.len(),
            table.row_count()
        )));
    }
    Ok(hashes)
}

/// A [`Hasher`] for keys that already are hash codes.
#[derive(Default, Clone, Copy)]
pub struct PrecomputedHasher {
    hash_code: u64,
}

impl Hasher for PrecomputedHasher {
    fn finish(&self) -> u64 {
        self.hash_code
    }

    fn write(&mut self, _bytes: &[u8]) {
        unreachable!("only `write_u64` is used for precomputed hash codes")
    }

    fn write_u64(&mut self, i: u64) {
        self.hash_code = i;
    }
}

pub type PrecomputedBuildHasher = BuildHasherDefault<PrecomputedHasher>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableTestExt;
    use crate::types::{DataType, ScalarImpl};

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_equal_values_hash_equal() {
        let table = Table::from_pretty(
            "a:I b:T c:F
             1   x   0.5
             1   x   9.5
             1   y   0.5
             2   x   0.5",
        );
        let hashes = hash_live_rows(&table, &fields(&["a", "b"])).unwrap();
        assert_eq!(hashes[0], hashes[1]);
        assert_ne!(hashes[0], hashes[2]);
        assert_ne!(hashes[0], hashes[3]);
    }

    #[test]
    fn test_order_sensitive() {
        let table = Table::from_pretty(
            "a:I b:I
             1   2
             2   1",
        );
        let hashes = hash_live_rows(&table, &fields(&["a", "b"])).unwrap();
        assert_ne!(hashes[0], hashes[1]);
        let swapped = hash_live_rows(&table, &fields(&["b", "a"])).unwrap();
        assert_eq!(hashes[0], swapped[1]);
    }

    #[test]
    fn test_literal_matches_row() {
        let table = Table::from_pretty(
            "brand:T cat:I
             nike    3",
        );
        let row_hash = hash_live_rows(&table, &fields(&["brand", "cat"])).unwrap()[0];
        let literal = [
            ScalarImpl::from_text("nike", &DataType::Varchar).unwrap(),
            ScalarImpl::from_text("3", &DataType::Int64).unwrap(),
        ];
        let literal_hash = hash_datums(literal.iter().map(|v| Some(v.as_scalar_ref_impl())));
        assert_eq!(row_hash, literal_hash);
    }

    #[test]
    fn test_missing_field() {
        let table = Table::from_pretty("a:I\n1");
        let err = hash_live_rows(&table, &fields(&["nope"])).unwrap_err();
        assert!(matches!(
            err.inner(),
            crate::error::ErrorKind::GroupKeyError(_)
        ));
    }
}
