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

//! Operators that buffer every input batch and produce a single table at end of input.

use sqs_common::error::{TvfError, TvfResult};
use sqs_common::memory::MemoryContextRef;
use sqs_common::table::Table;

use super::TvfOperator;

/// The algorithm part of an operator that accumulates all input before producing one output.
///
/// [`OnePassTvf`] owns the accumulated table and drives the algorithm through it.
pub trait OnePassAlgorithm: Send + 'static {
    /// Called after each batch is merged into `table`. Algorithms that can discard rows early to
    /// bound the working set do it here.
    fn on_merge(&mut self, table: &mut Table) -> TvfResult<()> {
        let _ = table;
        Ok(())
    }

    /// Computes the output from all accumulated rows. Returning `None` means no output could be
    /// produced, which the caller reports as an error.
    fn finalize(&mut self, table: Table) -> TvfResult<Option<Table>>;
}

enum OnePassState {
    /// Collecting batches. `None` until the first batch arrives.
    Accumulating(Option<Table>),
    /// Output has been released. Only [`OnePassTvf::reset`] leaves this state.
    Finalized,
}

/// Accumulate-until-end operator shape.
pub struct OnePassTvf<A> {
    identity: String,
    algorithm: A,
    state: OnePassState,
    mem_ctx: MemoryContextRef,
}

impl<A: OnePassAlgorithm> OnePassTvf<A> {
    pub fn new(identity: impl Into<String>, algorithm: A, mem_ctx: MemoryContextRef) -> Self {
        Self {
            identity: identity.into(),
            algorithm,
            state: OnePassState::Accumulating(None),
            mem_ctx,
        }
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, OnePassState::Finalized)
    }

    /// Drops any accumulated rows and starts over with no table.
    pub fn reset(&mut self) {
        self.state = OnePassState::Accumulating(None);
    }
}

impl<A: OnePassAlgorithm> TvfOperator for OnePassTvf<A> {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn compute(&mut self, input: Option<Table>, eof: bool) -> TvfResult<Option<Table>> {
        let accumulated = match &mut self.state {
            OnePassState::Accumulating(accumulated) => accumulated,
            OnePassState::Finalized => {
                return Err(TvfError::compute_error(format!(
                    "{}: already finalized",
                    self.identity
                )));
            }
        };

        if let Some(input) = input {
            let table = match accumulated.take() {
                Some(mut table) => {
                    table.merge(input)?;
                    table
                }
                None => input,
            };
            let table = accumulated.insert(table);
            self.algorithm.on_merge(table)?;
            debug!(
                identity = %self.identity,
                rows = table.row_count(),
                slots = table.slot_count(),
                mem_bytes = self.mem_ctx.get_bytes_used(),
                "batch merged"
            );
        }

        if !eof {
            return Ok(None);
        }

        let table = accumulated.take();
        self.state = OnePassState::Finalized;
        let Some(table) = table else {
            return Err(TvfError::compute_error(format!(
                "{}: input is null",
                self.identity
            )));
        };

        debug!(identity = %self.identity, rows = table.row_count(), "finalize begin");
        let output = self.algorithm.finalize(table)?.ok_or_else(|| {
            TvfError::compute_error(format!("{}: output is empty", self.identity))
        })?;
        debug!(identity = %self.identity, rows = output.row_count(), "finalize end");
        Ok(Some(output))
    }
}

#[cfg(test)]
mod tests {
    use sqs_common::error::ErrorKind;
    use sqs_common::memory::MemoryContext;
    use sqs_common::test_prelude::*;

    use super::*;

    /// Passes the accumulated table through and counts the merges it saw.
    #[derive(Default)]
    struct PassThrough {
        merges: usize,
        produce: bool,
    }

    impl OnePassAlgorithm for PassThrough {
        fn on_merge(&mut self, _table: &mut Table) -> TvfResult<()> {
            self.merges += 1;
            Ok(())
        }

        fn finalize(&mut self, table: Table) -> TvfResult<Option<Table>> {
            Ok(self.produce.then_some(table))
        }
    }

    fn pass_through() -> OnePassTvf<PassThrough> {
        OnePassTvf::new(
            "PassThrough",
            PassThrough {
                merges: 0,
                produce: true,
            },
            MemoryContext::none(),
        )
    }

    fn is_compute_error(result: TvfResult<Option<Table>>) -> bool {
        matches!(result.unwrap_err().inner(), ErrorKind::ComputeError(_))
    }

    #[test]
    fn test_accumulate_then_finalize() {
        let mut tvf = pass_through();
        assert!(tvf
            .compute(Some(Table::from_pretty("id:I\n1\n2")), false)
            .unwrap()
            .is_none());
        assert!(tvf.compute(None, false).unwrap().is_none());
        let output = tvf
            .compute(Some(Table::from_pretty("id:I\n3")), true)
            .unwrap()
            .unwrap();
        assert_eq!(output.row_count(), 3);
        assert_eq!(tvf.algorithm().merges, 2);
        assert!(tvf.is_finalized());
    }

    #[test]
    fn test_finalize_without_input() {
        let mut tvf = pass_through();
        assert!(is_compute_error(tvf.compute(None, true)));
    }

    #[test]
    fn test_second_finalize_fails() {
        let mut tvf = pass_through();
        tvf.compute(Some(Table::from_pretty("id:I\n1")), true)
            .unwrap()
            .unwrap();
        assert!(is_compute_error(tvf.compute(None, true)));
        assert!(is_compute_error(
            tvf.compute(Some(Table::from_pretty("id:I\n1")), true)
        ));

        tvf.reset();
        assert!(!tvf.is_finalized());
        assert!(is_compute_error(tvf.compute(None, true)));

        tvf.reset();
        let output = tvf
            .compute(Some(Table::from_pretty("id:I\n7")), true)
            .unwrap()
            .unwrap();
        assert_eq!(output.row_count(), 1);
    }

    #[test]
    fn test_output_is_empty() {
        let mut tvf = OnePassTvf::new("Nothing", PassThrough::default(), MemoryContext::none());
        assert!(is_compute_error(
            tvf.compute(Some(Table::from_pretty("id:I\n1")), true)
        ));
    }

    #[test]
    fn test_merge_error() {
        let mut tvf = pass_through();
        tvf.compute(Some(Table::from_pretty("id:I\n1")), false)
            .unwrap();
        let err = tvf
            .compute(Some(Table::from_pretty("name:T\nx")), true)
            .unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::MergeError(_)));
    }
}
