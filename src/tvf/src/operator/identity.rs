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
use crate::params::check_arity;

/// Returns every batch unchanged.
pub struct IdentityTvf {
    identity: String,
}

pub struct IdentityTvfBuilder;

impl TvfOperatorBuilder for IdentityTvfBuilder {
    fn new_boxed_operator(params: &[String], _ctx: &TvfContext) -> TvfResult<BoxedTvfOperator> {
        check_arity("identityTvf", params, 0)?;
        Ok(Box::new(IdentityTvf {
            identity: "IdentityTvf".to_owned(),
        }))
    }
}

impl TvfOperator for IdentityTvf {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn compute(&mut self, input: Option<Table>, _eof: bool) -> TvfResult<Option<Table>> {
        Ok(input)
    }
}
