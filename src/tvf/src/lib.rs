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

//! Table-valued functions: operators that turn one input table into one output table.
//!
//! Operators are built by name from a positional string parameter list through
//! [`operator::build_tvf`] and driven batch by batch through [`operator::TvfOperator::compute`].

#![feature(error_generic_member_access)]

#[macro_use]
extern crate tracing;

pub mod context;
pub mod operator;
pub mod params;
pub mod test_utils;

pub use context::{TvfContext, TvfPhase};
pub use operator::{build_tvf, BoxedTvfOperator, TvfOperator};
