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

//! The operator contract, the registry operators are built from, and every built-in operator.

mod distinct_top_n;
mod identity;
mod managed;
mod one_pass;
mod print_table;
mod rank;
mod rerank;
mod sort;
mod top_n;

pub use distinct_top_n::*;
pub use identity::*;
pub use managed::*;
pub use one_pass::*;
pub use print_table::*;
pub use rank::*;
pub use rerank::*;
pub use sort::*;
use sqs_common::error::{TvfError, TvfResult};
use sqs_common::table::Table;
use thiserror_ext::AsReport;
pub use top_n::*;

use crate::context::TvfContext;

pub type BoxedTvfOperator = Box<dyn TvfOperator>;

/// A table-valued function instance.
///
/// The host calls [`TvfOperator::compute`] once per input batch, in arrival order, and sets `eof`
/// on the last call. An instance processes one stream of batches and is never shared between
/// concurrent computations.
pub trait TvfOperator: Send + 'static {
    /// Identity string of the operator, for logging.
    fn identity(&self) -> &str;

    /// Feeds one batch.
    ///
    /// Returns `Ok(None)` while more input is needed. Per-batch operators return one output per
    /// batch; one-pass operators return their single output on the `eof` call.
    fn compute(&mut self, input: Option<Table>, eof: bool) -> TvfResult<Option<Table>>;
}

impl std::fmt::Debug for BoxedTvfOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identity())
    }
}

/// Every operator provides a static method that parses its parameter list and builds an
/// instance. Parameters are validated here; a built operator never fails on its configuration.
pub trait TvfOperatorBuilder {
    fn new_boxed_operator(params: &[String], ctx: &TvfContext) -> TvfResult<BoxedTvfOperator>;
}

/// Descriptor for operator builder.
///
/// We will call `builder` to build the operator if `name` matches.
pub struct TvfBuilderDescriptor {
    pub name: &'static str,

    /// Typically from [`TvfOperatorBuilder::new_boxed_operator`].
    pub builder: fn(params: &[String], ctx: &TvfContext) -> TvfResult<BoxedTvfOperator>,
}

/// All registered operator builders.
#[linkme::distributed_slice]
pub static TVF_BUILDER_DESCS: [TvfBuilderDescriptor];

/// Register an operator builder so that it can be built by name.
macro_rules! register_tvf {
    ($name:literal, $builder:ty) => {
        const _: () = {
            use crate::operator::{TvfBuilderDescriptor, TvfOperatorBuilder, TVF_BUILDER_DESCS};

            #[linkme::distributed_slice(TVF_BUILDER_DESCS)]
            static BUILDER: TvfBuilderDescriptor = TvfBuilderDescriptor {
                name: $name,
                builder: <$builder as TvfOperatorBuilder>::new_boxed_operator,
            };
        };
    };
}
pub(crate) use register_tvf;

register_tvf!("identityTvf", IdentityTvfBuilder);
register_tvf!("printTableTvf", PrintTableTvfBuilder);
register_tvf!("sortTvf", SortTvfBuilder);
register_tvf!("topKTvf", TopKTvfBuilder);
register_tvf!("topKMarkTvf", TopKMarkTvfBuilder);
register_tvf!("rankTvf", RankTvfBuilder);
register_tvf!("unorderRankTvf", UnorderRankTvfBuilder);
register_tvf!("distinctTopNTvf", DistinctTopNTvfBuilder);
register_tvf!("rerankByQuotaTvf", RerankByQuotaTvfBuilder);
register_tvf!("simpleRerankTvf", SimpleRerankTvfBuilder);
register_tvf!("taobaoSpRerankTvf", TaobaoSpRerankTvfBuilder);

/// Names of all registered operators, sorted.
pub fn registered_tvf_names() -> Vec<&'static str> {
    let mut names: Vec<_> = TVF_BUILDER_DESCS.iter().map(|desc| desc.name).collect();
    names.sort_unstable();
    names
}

/// Builds the operator registered as `name`.
///
/// The result checks every produced table against the output fields declared in `ctx`.
pub fn build_tvf(name: &str, params: &[String], ctx: &TvfContext) -> TvfResult<BoxedTvfOperator> {
    try_build_tvf(name, params, ctx).inspect_err(|e| {
        error!(error = %e.as_report(), tvf = name, ?params, "failed to build tvf");
    })
}

fn try_build_tvf(
    name: &str,
    params: &[String],
    ctx: &TvfContext,
) -> TvfResult<BoxedTvfOperator> {
    let builder = TVF_BUILDER_DESCS
        .iter()
        .find(|desc| desc.name == name)
        .ok_or_else(|| TvfError::config_error(format!("no tvf registered as `{name}`")))?
        .builder;

    let operator = builder(params, ctx)?;
    debug!(identity = operator.identity(), phase = %ctx.phase(), "built tvf");

    match ctx.output_fields() {
        Some(fields) => Ok(Box::new(ManagedTvf::new(operator, fields.to_vec()))),
        None => Ok(operator),
    }
}
