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

//! Drives operators through the registry only, the way a host would.

use std::sync::Arc;

use expect_test::expect;
use sqs_common::config::TvfConfig;
use sqs_common::error::ErrorKind;
use sqs_common::memory::{MemoryContext, MemoryContextRef};
use sqs_common::table::Table;
use sqs_common::test_prelude::*;
use sqs_tvf::test_utils::{live_int64_values, params, run_to_end};
use sqs_tvf::{build_tvf, TvfContext, TvfPhase};

fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn shards() -> Vec<Table> {
    vec![
        Table::from_pretty(
            "id:I trigger:I group:I score:F
             100  1         1       80
             101  1         1       70
             200  1         2       100
             202  1         2       30
             302  2         1       20",
        ),
        Table::from_pretty(
            "id:I trigger:I group:I score:F
             102  1         1       40
             201  1         2       50
             300  2         1       90
             301  2         1       60",
        ),
    ]
}

#[test]
fn test_two_phase_distinct_top_n() {
    init_logger();
    let p = params(&["trigger,group", "-score", "6", "2", "4", "2"]);

    let partial_ctx = TvfContext::for_test(TvfPhase::Partial);
    let mut partial_outputs = vec![];
    for shard in shards() {
        let mut tvf = build_tvf("distinctTopNTvf", &p, &partial_ctx).unwrap();
        let output = tvf.compute(Some(shard), true).unwrap().unwrap();
        assert!(output.row_count() <= 4);
        partial_outputs.push(output);
    }

    let final_ctx = TvfContext::for_test(TvfPhase::Final);
    let mut tvf = build_tvf("distinctTopNTvf", &p, &final_ctx).unwrap();
    let output = run_to_end(tvf.as_mut(), partial_outputs).unwrap().unwrap();
    assert_eq!(
        live_int64_values(&output, "id"),
        vec![200, 300, 100, 101, 301, 201]
    );
}

#[test]
fn test_two_phase_sort() {
    init_logger();
    let p = params(&["-score", "3"]);
    let partial_ctx = TvfContext::for_test(TvfPhase::Partial);
    let partial_outputs = shards()
        .into_iter()
        .map(|shard| {
            let mut tvf = build_tvf("sortTvf", &p, &partial_ctx).unwrap();
            tvf.compute(Some(shard), true).unwrap().unwrap()
        })
        .collect::<Vec<_>>();

    let mut tvf = build_tvf("sortTvf", &p, &TvfContext::for_test(TvfPhase::Final)).unwrap();
    let output = run_to_end(tvf.as_mut(), partial_outputs).unwrap().unwrap();
    expect![[r#"
        id:I trigger:I group:I score:F
        200 1 2 100
        300 2 1 90
        100 1 1 80"#]]
    .assert_eq(&output.to_pretty());
}

/// Moves the rows of `table` into a table charged to `mem_ctx`.
fn charged_to(table: Table, mem_ctx: &MemoryContextRef) -> Table {
    let mut charged = Table::new(table.schema().clone(), mem_ctx.clone());
    charged.merge(table).unwrap();
    charged
}

#[test]
fn test_mark_with_memory_accounting() {
    init_logger();
    let root = MemoryContext::root();
    let config = Arc::new(TvfConfig::from_toml_str("topk_mark_field = \"in_top\"").unwrap());
    let ctx = TvfContext::new(MemoryContext::child(&root), TvfPhase::Final, config)
        .with_output_fields(vec!["id".to_owned(), "in_top".to_owned()]);

    let mut tvf = build_tvf("topKMarkTvf", &params(&["-score", "2", ""]), &ctx).unwrap();
    for shard in shards() {
        let batch = charged_to(shard, ctx.mem_ctx());
        assert!(tvf.compute(Some(batch), false).unwrap().is_none());
    }
    assert!(root.get_bytes_used() > 0);

    let output = tvf.compute(None, true).unwrap().unwrap();
    assert_eq!(output.row_count(), 9);
    assert_eq!(live_int64_values(&output, "id")[..2], [200, 300]);

    drop(output);
    assert_eq!(root.get_bytes_used(), 0);
}

#[test]
fn test_declared_output_fields() {
    init_logger();
    let ctx = TvfContext::for_test(TvfPhase::Final)
        .with_output_fields(vec!["id".to_owned(), "in_top".to_owned()]);
    let mut tvf = build_tvf("printTableTvf", &params(&["3"]), &ctx).unwrap();
    for shard in shards() {
        let err = tvf.compute(Some(shard), false).unwrap_err();
        assert!(matches!(err.inner(), ErrorKind::ComputeError(_)));
    }
}

#[test]
fn test_config_errors_surface_at_build() {
    init_logger();
    let ctx = TvfContext::for_test(TvfPhase::Final);
    for (name, p) in [
        ("sortTvf", &["-score"][..]),
        ("rankTvf", &["shop", "+a,,b", "2"]),
        ("simpleRerankTvf", &["brand", "nike;adidas", "1", "", "true"]),
        ("taobaoSpRerankTvf", &["brand,cat", "nike", "1", ""]),
        ("noSuchTvf", &[]),
    ] {
        let err = build_tvf(name, &params(p), &ctx).unwrap_err();
        assert!(
            matches!(err.inner(), ErrorKind::ConfigError(_)),
            "{name}: {err:?}"
        );
    }
}
