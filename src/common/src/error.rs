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

use strum_macros::AsRefStr;

/// A specialized Result type for table-valued functions and the row store they run on.
pub type TvfResult<T> = std::result::Result<T, TvfError>;

/// The error type for table-valued functions.
///
/// Every variant is fatal for the call that produced it. Nothing in this crate retries.
#[derive(thiserror::Error, thiserror_ext::ReportDebug, thiserror_ext::Box, thiserror_ext::Construct)]
#[thiserror_ext(newtype(name = TvfError))]
#[derive(AsRefStr)]
pub enum ErrorKind {
    /// Bad parameter arity or format. Raised at `init`, the operator never runs.
    #[error("Config error: {0}")]
    ConfigError(String),

    /// A sort or rerank field is missing from the table.
    #[error("Comparator error: {0}")]
    ComparatorError(String),

    /// Group-key hashing failed or produced a hash count that does not match the row count.
    #[error("Group key error: {0}")]
    GroupKeyError(String),

    /// A batch could not be merged into the accumulated table.
    #[error("Merge error: {0}")]
    MergeError(String),

    /// Finalize was called without input, or produced no output.
    #[error("Compute error: {0}")]
    ComputeError(String),

    #[error("Invalid row id {row_id}: table has {slots} slots")]
    InvalidRowId { row_id: usize, slots: usize },

    #[error("Type mismatch on column `{column}`: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Uncategorized(#[from] anyhow::Error),
}
