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

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{TvfError, TvfResult};

/// Node-level settings shared by all table-valued functions.
///
/// Per-call settings come from the operator's parameter list; these only provide defaults and
/// tuning knobs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TvfConfig {
    /// An accumulated table is compacted once its physical slots exceed this many times its live
    /// rows.
    #[serde(default = "default::compaction_ratio")]
    pub compaction_ratio: usize,

    /// Column added by `topKMarkTvf` when the call does not name one.
    #[serde(default = "default::topk_mark_field")]
    pub topk_mark_field: String,

    /// Rows logged per batch by `printTableTvf` when the call does not give a limit.
    #[serde(default = "default::print_table_max_rows")]
    pub print_table_max_rows: usize,

    /// Rerank candidate window used when the call leaves the window size empty.
    #[serde(default = "default::window_size")]
    pub default_window_size: usize,
}

impl Default for TvfConfig {
    fn default() -> Self {
        toml::from_str("").unwrap()
    }
}

impl TvfConfig {
    pub fn from_toml_str(s: &str) -> TvfResult<Self> {
        toml::from_str(s)
            .map_err(|e| TvfError::config_error(format!("failed to parse tvf config: {e}")))
    }

    /// Loads the config file at `path`, or the defaults if no path is given.
    pub fn load(path: Option<&Path>) -> TvfResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read tvf config {}", path.display()))?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), ?config, "loaded tvf config");
        Ok(config)
    }
}

mod default {
    pub fn compaction_ratio() -> usize {
        2
    }

    pub fn topk_mark_field() -> String {
        "__topk_mark".to_owned()
    }

    pub fn print_table_max_rows() -> usize {
        100
    }

    pub fn window_size() -> usize {
        16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = TvfConfig::default();
        assert_eq!(config.compaction_ratio, 2);
        assert_eq!(config.topk_mark_field, "__topk_mark");
        assert_eq!(config.print_table_max_rows, 100);
        assert_eq!(config.default_window_size, 16);
        assert_eq!(TvfConfig::load(None).unwrap(), config);
    }

    #[test]
    fn test_partial_override() {
        let config = TvfConfig::from_toml_str(
            r#"
            compaction_ratio = 4
            topk_mark_field = "in_top"
            "#,
        )
        .unwrap();
        assert_eq!(config.compaction_ratio, 4);
        assert_eq!(config.topk_mark_field, "in_top");
        assert_eq!(config.default_window_size, 16);
    }

    #[test]
    fn test_bad_config() {
        let err = TvfConfig::from_toml_str("compaction_ratio = \"many\"").unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::ConfigError(_)));

        let err = TvfConfig::load(Some(Path::new("/nonexistent/tvf.toml"))).unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::Uncategorized(_)));
    }
}
