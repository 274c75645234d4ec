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

//! Parsing of the positional string parameters operators are built from.
//!
//! Every parser fails with a `ConfigError` naming the offending text, so a bad call never reaches
//! `compute`.

use itertools::Itertools;
use sqs_common::error::{TvfError, TvfResult};
use sqs_common::util::sort_util::{FieldOrder, OrderType};

const LIST_SEPARATOR: char = ',';
const TUPLE_SEPARATOR: char = ';';

/// Checks that `params` has exactly `expected` entries.
pub fn check_arity(name: &str, params: &[String], expected: usize) -> TvfResult<()> {
    check_arity_range(name, params, expected, expected)
}

pub fn check_arity_range(name: &str, params: &[String], min: usize, max: usize) -> TvfResult<()> {
    if params.len() < min || params.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{min} to {max}")
        };
        return Err(TvfError::config_error(format!(
            "{name} expects {expected} parameters, got {}: {params:?}",
            params.len()
        )));
    }
    Ok(())
}

/// Parses a comma separated field list. An empty string is an empty list, but an empty entry
/// inside a list is an error.
pub fn parse_field_list(s: &str) -> TvfResult<Vec<String>> {
    if s.trim().is_empty() {
        return Ok(vec![]);
    }
    s.split(LIST_SEPARATOR)
        .map(|field| {
            let field = field.trim();
            if field.is_empty() {
                Err(TvfError::config_error(format!("empty field name in {s:?}")))
            } else {
                Ok(field.to_owned())
            }
        })
        .try_collect()
}

/// Parses a sort spec such as `+price,-sales,id`. Fields without a sign sort ascending.
///
/// An empty string is an empty spec; use [`parse_required_sort_spec`] where one is mandatory.
pub fn parse_sort_spec(s: &str) -> TvfResult<Vec<FieldOrder>> {
    if s.trim().is_empty() {
        return Ok(vec![]);
    }
    s.split(LIST_SEPARATOR)
        .map(|token| {
            let token = token.trim();
            let (order_type, field) = match token.as_bytes().first() {
                Some(b'+') => (OrderType::Ascending, &token[1..]),
                Some(b'-') => (OrderType::Descending, &token[1..]),
                _ => (OrderType::Ascending, token),
            };
            let field = field.trim();
            if field.is_empty() {
                return Err(TvfError::config_error(format!(
                    "empty sort field in {s:?}"
                )));
            }
            Ok(FieldOrder::new(field, order_type))
        })
        .try_collect()
}

pub fn parse_required_sort_spec(s: &str) -> TvfResult<Vec<FieldOrder>> {
    let orders = parse_sort_spec(s)?;
    if orders.is_empty() {
        return Err(TvfError::config_error("sort spec must not be empty"));
    }
    Ok(orders)
}

/// Parses a row count. Empty or negative means unbounded and yields `None`.
pub fn parse_count(s: &str) -> TvfResult<Option<usize>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let count: i64 = s
        .parse()
        .map_err(|e| TvfError::config_error(format!("invalid count {s:?}: {e}")))?;
    Ok(usize::try_from(count).ok())
}

/// Parses a non-negative limit.
pub fn parse_limit(s: &str) -> TvfResult<usize> {
    let s = s.trim();
    s.parse()
        .map_err(|e| TvfError::config_error(format!("invalid limit {s:?}: {e}")))
}

/// Parses a non-negative limit, falling back to `default` when `s` is empty.
pub fn parse_limit_or(s: &str, default: usize) -> TvfResult<usize> {
    if s.trim().is_empty() {
        Ok(default)
    } else {
        parse_limit(s)
    }
}

/// Parses a comma separated list of non-negative limits.
pub fn parse_limit_list(s: &str) -> TvfResult<Vec<usize>> {
    if s.trim().is_empty() {
        return Ok(vec![]);
    }
    s.split(LIST_SEPARATOR).map(parse_limit).try_collect()
}

/// Accepts `true`/`false`/`1`/`0`, ignoring case. An empty string is `false`.
pub fn parse_bool(s: &str) -> TvfResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        _ => Err(TvfError::config_error(format!("invalid boolean {s:?}"))),
    }
}

/// Parses bucket target tuples such as `nike,1;adidas,2`. Each tuple must hold exactly `arity`
/// literals, one per quota field.
pub fn parse_quota_targets(s: &str, arity: usize) -> TvfResult<Vec<Vec<String>>> {
    if s.trim().is_empty() {
        return Ok(vec![]);
    }
    s.split(TUPLE_SEPARATOR)
        .map(|tuple| {
            let values = tuple
                .split(LIST_SEPARATOR)
                .map(|v| v.trim().to_owned())
                .collect_vec();
            if values.len() != arity {
                return Err(TvfError::config_error(format!(
                    "quota target {tuple:?} has {} values, expected {arity}",
                    values.len()
                )));
            }
            Ok(values)
        })
        .try_collect()
}

#[cfg(test)]
mod tests {
    use sqs_common::error::ErrorKind;

    use super::*;

    fn is_config_error<T: std::fmt::Debug>(result: TvfResult<T>) -> bool {
        matches!(result.unwrap_err().inner(), ErrorKind::ConfigError(_))
    }

    #[test]
    fn test_sort_spec() {
        let orders = parse_sort_spec("+price, -sales,id").unwrap();
        assert_eq!(
            orders,
            vec![
                FieldOrder::ascending("price"),
                FieldOrder::descending("sales"),
                FieldOrder::ascending("id"),
            ]
        );
        assert!(parse_sort_spec("").unwrap().is_empty());
        assert!(is_config_error(parse_sort_spec("+a,,b")));
        assert!(is_config_error(parse_sort_spec("-")));
        assert!(is_config_error(parse_required_sort_spec(" ")));
    }

    #[test]
    fn test_counts_and_limits() {
        assert_eq!(parse_count("5").unwrap(), Some(5));
        assert_eq!(parse_count("0").unwrap(), Some(0));
        assert_eq!(parse_count("-1").unwrap(), None);
        assert_eq!(parse_count("").unwrap(), None);
        assert!(is_config_error(parse_count("five")));

        assert_eq!(parse_limit(" 3 ").unwrap(), 3);
        assert!(is_config_error(parse_limit("-3")));
        assert_eq!(parse_limit_or("", 16).unwrap(), 16);
        assert_eq!(parse_limit_list("2500,1250, 1250").unwrap(), vec![2500, 1250, 1250]);
        assert!(is_config_error(parse_limit_list("1,,2")));
    }

    #[test]
    fn test_bool() {
        assert!(parse_bool("TRUE").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("false").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(is_config_error(parse_bool("yes")));
    }

    #[test]
    fn test_field_list_and_targets() {
        assert_eq!(parse_field_list("a, b").unwrap(), vec!["a", "b"]);
        assert!(parse_field_list("").unwrap().is_empty());
        assert!(is_config_error(parse_field_list("a,")));

        let targets = parse_quota_targets("nike,1;adidas,2", 2).unwrap();
        assert_eq!(targets, vec![vec!["nike", "1"], vec!["adidas", "2"]]);
        assert!(is_config_error(parse_quota_targets("nike,1;adidas", 2)));
    }

    #[test]
    fn test_arity() {
        let params = vec!["a".to_owned(), "b".to_owned()];
        check_arity("sortTvf", &params, 2).unwrap();
        assert!(is_config_error(check_arity("sortTvf", &params, 3)));
        check_arity_range("printTableTvf", &params[..1], 0, 1).unwrap();
    }
}
