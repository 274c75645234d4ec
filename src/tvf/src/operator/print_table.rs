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

use sqs_common::error::TvfResult;
use sqs_common::table::Table;

use super::{BoxedTvfOperator, TvfOperator, TvfOperatorBuilder};
use crate::context::TvfContext;
use crate::params::{check_arity_range, parse_limit_or};

/// Logs the leading rows of every batch at `info` level and passes the batch through.
pub struct PrintTableTvf {
    identity: String,
    max_rows: usize,
}

pub struct PrintTableTvfBuilder;

impl TvfOperatorBuilder for PrintTableTvfBuilder {
    fn new_boxed_operator(params: &[String], ctx: &TvfContext) -> TvfResult<BoxedTvfOperator> {
        check_arity_range("printTableTvf", params, 0, 1)?;
        let default = ctx.config().print_table_max_rows;
        let max_rows = match params.first() {
            Some(s) => parse_limit_or(s, default)?,
            None => default,
        };
        Ok(Box::new(PrintTableTvf {
            identity: "PrintTableTvf".to_owned(),
            max_rows,
        }))
    }
}

impl PrintTableTvf {
    /// Renders the header and at most `max_rows` rows.
    fn render(&self, table: &Table) -> String {
        let pretty = table.to_pretty();
        let mut lines = pretty.lines();
        let header = lines.next().unwrap_or_default();
        let mut out = header.to_owned();
        for line in lines.take(self.max_rows) {
            out.push('\n');
            out.push_str(line);
        }
        if table.row_count() > self.max_rows {
            out.push_str(&format!("\n... {} more rows", table.row_count() - self.max_rows));
        }
        out
    }
}

impl TvfOperator for PrintTableTvf {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn compute(&mut self, input: Option<Table>, eof: bool) -> TvfResult<Option<Table>> {
        if let Some(table) = &input {
            info!(
                identity = %self.identity,
                rows = table.row_count(),
                eof,
                "\n{}",
                self.render(table)
            );
        }
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use sqs_common::test_prelude::*;

    use super::*;
    use crate::context::TvfPhase;

    #[test]
    fn test_render_limit() {
        let ctx = TvfContext::for_test(TvfPhase::Final);
        let tvf = PrintTableTvf {
            identity: "PrintTableTvf".to_owned(),
            max_rows: 2,
        };
        let table = Table::from_pretty(
            "id:I name:T
             1    a
             2    b
             3    c",
        );
        expect![[r#"
            id:I name:T
            1 a
            2 b
            ... 1 more rows"#]]
        .assert_eq(&tvf.render(&table));

        let mut tvf = PrintTableTvfBuilder::new_boxed_operator(&[], &ctx).unwrap();
        let output = tvf.compute(Some(table), true).unwrap().unwrap();
        assert_eq!(output.row_count(), 3);
    }

    #[test]
    fn test_bad_params() {
        let ctx = TvfContext::for_test(TvfPhase::Final);
        assert!(PrintTableTvfBuilder::new_boxed_operator(&["ten".to_owned()], &ctx).is_err());
        assert!(
            PrintTableTvfBuilder::new_boxed_operator(&["1".to_owned(), "2".to_owned()], &ctx)
                .is_err()
        );
    }
}
