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

use std::sync::Arc;

use parse_display::Display;
use sqs_common::config::TvfConfig;
use sqs_common::memory::{MemoryContext, MemoryContextRef};

/// Stage of a shard-then-merge plan an operator instance runs in.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default)]
#[display(style = "snake_case")]
pub enum TvfPhase {
    /// Runs once per shard, before the shard outputs are merged.
    Partial,
    /// Runs once over the merged shard outputs, or alone in a single-shard plan.
    #[default]
    Final,
}

/// What the host hands to every operator it builds.
#[derive(Debug, Clone)]
pub struct TvfContext {
    mem_ctx: MemoryContextRef,
    phase: TvfPhase,
    /// Fields the host expects in every produced table.
    output_fields: Option<Vec<String>>,
    config: Arc<TvfConfig>,
}

impl TvfContext {
    pub fn new(mem_ctx: MemoryContextRef, phase: TvfPhase, config: Arc<TvfConfig>) -> Self {
        Self {
            mem_ctx,
            phase,
            output_fields: None,
            config,
        }
    }

    /// Context with an unaccounted memory context and default config.
    pub fn for_test(phase: TvfPhase) -> Self {
        Self::new(MemoryContext::none(), phase, Arc::new(TvfConfig::default()))
    }

    #[must_use]
    pub fn with_output_fields(mut self, fields: Vec<String>) -> Self {
        self.output_fields = Some(fields);
        self
    }

    pub fn mem_ctx(&self) -> &MemoryContextRef {
        &self.mem_ctx
    }

    pub fn phase(&self) -> TvfPhase {
        self.phase
    }

    pub fn output_fields(&self) -> Option<&[String]> {
        self.output_fields.as_deref()
    }

    pub fn config(&self) -> &TvfConfig {
        &self.config
    }
}
