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
use sqs_common::error::{TvfError, TvfResult};
use sqs_common::table::Table;

use super::{BoxedTvfOperator, TvfOperator};

/// `ManagedTvf` wraps an operator built for a host that declared its expected output fields.
/// Every table the inner operator produces must contain all of them.
pub struct ManagedTvf {
    child: BoxedTvfOperator,
    output_fields: Vec<String>,
}

impl ManagedTvf {
    pub fn new(child: BoxedTvfOperator, output_fields: Vec<String>) -> Self {
        Self {
            child,
            output_fields,
        }
    }
}

impl TvfOperator for ManagedTvf {
    fn identity(&self) -> &str {
        self.child.identity()
    }

    fn compute(&mut self, input: Option<Table>, eof: bool) -> TvfResult<Option<Table>> {
        let output = self.child.compute(input, eof)?;
        if let Some(table) = &output {
            check_output_fields(table, &self.output_fields)?;
        }
        Ok(output)
    }
}

/// Fails if any of `fields` is missing from `table`.
pub fn check_output_fields(table: &Table, fields: &[String]) -> TvfResult<()> {
    let missing = fields
        .iter()
        .filter(|f| table.column_index(f).is_none())
        .collect_vec();
    if !missing.is_empty() {
        return Err(TvfError::compute_error(format!(
            "declared output fields {missing:?} not found in {}",
            table.schema()
        )));
    }
    Ok(())
}
