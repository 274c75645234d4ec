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

//! Column element kinds and the scalar values stored in them.

use std::fmt;

use itertools::Itertools;
use parse_display::Display;

use crate::error::{TvfError, TvfResult};

mod ordered_float;

pub use ordered_float::F64;

/// Separator between elements of a multi-value written as text.
pub const MULTI_VALUE_SEPARATOR: char = '|';

/// Kind of the values held by one column.
///
/// A column is either scalar or multi-valued. Multi-value elements are always scalars, nesting is
/// not supported.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    #[display("boolean")]
    Boolean,
    #[display("integer")]
    Int32,
    #[display("bigint")]
    Int64,
    #[display("double precision")]
    Float64,
    #[display("varchar")]
    Varchar,
    #[display("{0}[]")]
    List(Box<DataType>),
}

impl DataType {
    pub fn is_list(&self) -> bool {
        matches!(self, DataType::List(_))
    }

    /// Creates a multi-value type. Nested lists are rejected.
    pub fn list(elem: DataType) -> TvfResult<Self> {
        if elem.is_list() {
            return Err(TvfError::config_error(format!(
                "nested multi-value type `{elem}[]` is not supported"
            )));
        }
        Ok(DataType::List(Box::new(elem)))
    }

    /// Parses the short type code used by table literals, e.g. `i`, `F` or `[T]`.
    pub fn from_type_code(code: &str) -> TvfResult<Self> {
        let ty = match code {
            "B" => DataType::Boolean,
            "i" => DataType::Int32,
            "I" => DataType::Int64,
            "F" => DataType::Float64,
            "T" => DataType::Varchar,
            list if list.len() > 2 && list.starts_with('[') && list.ends_with(']') => {
                DataType::list(DataType::from_type_code(&list[1..list.len() - 1])?)?
            }
            _ => {
                return Err(TvfError::config_error(format!(
                    "unsupported type code: {code:?}"
                )));
            }
        };
        Ok(ty)
    }

    pub fn type_code(&self) -> String {
        match self {
            DataType::Boolean => "B".to_owned(),
            DataType::Int32 => "i".to_owned(),
            DataType::Int64 => "I".to_owned(),
            DataType::Float64 => "F".to_owned(),
            DataType::Varchar => "T".to_owned(),
            DataType::List(elem) => format!("[{}]", elem.type_code()),
        }
    }
}

/// A multi-value: the elements one row holds in a multi-valued column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ListValue {
    values: Box<[ScalarImpl]>,
}

impl ListValue {
    pub fn new(values: Vec<ScalarImpl>) -> Self {
        Self {
            values: values.into_boxed_slice(),
        }
    }

    pub fn values(&self) -> &[ScalarImpl] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An owned scalar value.
///
/// The derived ordering compares the discriminant first. Values of one column always share a
/// variant, so for comparisons inside a column this is the natural order of the payload, and
/// multi-values compare lexicographically element by element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalarImpl {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(F64),
    Utf8(Box<str>),
    List(ListValue),
}

/// A borrowed scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalarRefImpl<'a> {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(F64),
    Utf8(&'a str),
    List(&'a [ScalarImpl]),
}

pub type Datum = Option<ScalarImpl>;
pub type DatumRef<'a> = Option<ScalarRefImpl<'a>>;

impl ScalarImpl {
    pub fn as_scalar_ref_impl(&self) -> ScalarRefImpl<'_> {
        match self {
            ScalarImpl::Bool(v) => ScalarRefImpl::Bool(*v),
            ScalarImpl::Int32(v) => ScalarRefImpl::Int32(*v),
            ScalarImpl::Int64(v) => ScalarRefImpl::Int64(*v),
            ScalarImpl::Float64(v) => ScalarRefImpl::Float64(*v),
            ScalarImpl::Utf8(v) => ScalarRefImpl::Utf8(v),
            ScalarImpl::List(v) => ScalarRefImpl::List(v.values()),
        }
    }

    /// Parses a textual literal into a value of `data_type`.
    ///
    /// Multi-values are written as their elements joined by [`MULTI_VALUE_SEPARATOR`]; an empty
    /// string is an empty multi-value.
    pub fn from_text(s: &str, data_type: &DataType) -> TvfResult<Self> {
        let invalid = |e: &dyn fmt::Display| {
            TvfError::config_error(format!("cannot parse {s:?} as {data_type}: {e}"))
        };
        let scalar = match data_type {
            DataType::Boolean => match s.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "1" => ScalarImpl::Bool(true),
                "f" | "false" | "0" => ScalarImpl::Bool(false),
                _ => return Err(invalid(&"not a boolean")),
            },
            DataType::Int32 => ScalarImpl::Int32(s.trim().parse().map_err(|e| invalid(&e))?),
            DataType::Int64 => ScalarImpl::Int64(s.trim().parse().map_err(|e| invalid(&e))?),
            DataType::Float64 => ScalarImpl::Float64(s.trim().parse().map_err(|e| invalid(&e))?),
            DataType::Varchar => ScalarImpl::Utf8(s.into()),
            DataType::List(elem) => {
                if s.is_empty() {
                    ScalarImpl::List(ListValue::default())
                } else {
                    let values = s
                        .split(MULTI_VALUE_SEPARATOR)
                        .map(|v| ScalarImpl::from_text(v, elem))
                        .try_collect()?;
                    ScalarImpl::List(ListValue::new(values))
                }
            }
        };
        Ok(scalar)
    }

    /// Returns the kind of this value. Empty multi-values report an `integer[]` element kind since
    /// there is nothing to infer it from.
    pub fn data_type(&self) -> DataType {
        self.as_scalar_ref_impl().data_type()
    }
}

impl<'a> ScalarRefImpl<'a> {
    pub fn into_scalar_impl(self) -> ScalarImpl {
        match self {
            ScalarRefImpl::Bool(v) => ScalarImpl::Bool(v),
            ScalarRefImpl::Int32(v) => ScalarImpl::Int32(v),
            ScalarRefImpl::Int64(v) => ScalarImpl::Int64(v),
            ScalarRefImpl::Float64(v) => ScalarImpl::Float64(v),
            ScalarRefImpl::Utf8(v) => ScalarImpl::Utf8(v.into()),
            ScalarRefImpl::List(v) => ScalarImpl::List(ListValue::new(v.to_vec())),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ScalarRefImpl::Bool(_) => DataType::Boolean,
            ScalarRefImpl::Int32(_) => DataType::Int32,
            ScalarRefImpl::Int64(_) => DataType::Int64,
            ScalarRefImpl::Float64(_) => DataType::Float64,
            ScalarRefImpl::Utf8(_) => DataType::Varchar,
            ScalarRefImpl::List(v) => DataType::List(Box::new(
                v.first().map_or(DataType::Int32, ScalarImpl::data_type),
            )),
        }
    }
}

impl fmt::Display for ScalarRefImpl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarRefImpl::Bool(v) => write!(f, "{}", if *v { "t" } else { "f" }),
            ScalarRefImpl::Int32(v) => write!(f, "{v}"),
            ScalarRefImpl::Int64(v) => write!(f, "{v}"),
            ScalarRefImpl::Float64(v) => write!(f, "{v}"),
            ScalarRefImpl::Utf8(v) => write!(f, "{v}"),
            ScalarRefImpl::List(v) => write!(
                f,
                "{}",
                v.iter()
                    .format_with(&MULTI_VALUE_SEPARATOR.to_string(), |v, f| f(
                        &v.as_scalar_ref_impl()
                    ))
            ),
        }
    }
}

impl fmt::Display for ScalarImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_scalar_ref_impl().fmt(f)
    }
}

macro_rules! impl_from_native {
    ($($native:ty => $variant:ident),*) => {
        $(
            impl From<$native> for ScalarImpl {
                fn from(v: $native) -> Self {
                    ScalarImpl::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_native!(bool => Bool, i32 => Int32, i64 => Int64, f64 => Float64, F64 => Float64, &str => Utf8, String => Utf8);

impl From<ListValue> for ScalarImpl {
    fn from(v: ListValue) -> Self {
        ScalarImpl::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text() {
        assert_eq!(
            ScalarImpl::from_text("42", &DataType::Int32).unwrap(),
            ScalarImpl::Int32(42)
        );
        assert_eq!(
            ScalarImpl::from_text("TRUE", &DataType::Boolean).unwrap(),
            ScalarImpl::Bool(true)
        );
        assert_eq!(
            ScalarImpl::from_text("1|2|3", &DataType::List(Box::new(DataType::Int64))).unwrap(),
            ScalarImpl::List(ListValue::new(vec![1i64.into(), 2i64.into(), 3i64.into()]))
        );
        assert!(ScalarImpl::from_text("x", &DataType::Int64).is_err());
    }

    #[test]
    fn test_type_code() {
        for code in ["B", "i", "I", "F", "T", "[i]", "[T]"] {
            assert_eq!(DataType::from_type_code(code).unwrap().type_code(), code);
        }
        assert!(DataType::from_type_code("[[i]]").is_err());
        assert_eq!(
            DataType::from_type_code("[F]").unwrap().to_string(),
            "double precision[]"
        );
    }

    #[test]
    fn test_multi_value_order() {
        let a = ScalarImpl::List(ListValue::new(vec![1i32.into(), 2i32.into()]));
        let b = ScalarImpl::List(ListValue::new(vec![1i32.into(), 3i32.into()]));
        let c = ScalarImpl::List(ListValue::new(vec![1i32.into()]));
        assert!(a < b);
        assert!(c < a);
        assert_eq!(a.to_string(), "1|2");
    }
}
