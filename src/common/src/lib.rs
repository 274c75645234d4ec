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

//! Row store, values, comparators and group-key hashing shared by the table-valued functions.

#![feature(error_generic_member_access)]

#[macro_use]
extern crate tracing;

pub mod array;
pub mod catalog;
pub mod config;
pub mod error;
pub mod hash;
pub mod memory;
pub mod table;
pub mod types;
pub mod util;

pub mod test_prelude {
    pub use super::table::TableTestExt;
}
