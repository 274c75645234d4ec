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

//! Typed column storage.
//!
//! Every column kind is one variant of [`ArrayImpl`], all backed by the same generic
//! [`ValueArray`]. Kind-independent operations go through [`ArrayImpl::as_dyn`] and
//! [`ArrayImpl::as_dyn_mut`], so there is a single place that dispatches on the kind.

use std::mem::size_of;

use crate::types::{DataType, Datum, DatumRef, ListValue, ScalarImpl, ScalarRefImpl, F64};

/// A value that can be stored in a [`ValueArray`].
pub trait ScalarItem: Clone + Send + Sync + 'static {
    fn as_scalar_ref(&self) -> ScalarRefImpl<'_>;

    /// Returns the scalar back if it has a different kind.
    fn try_from_scalar(scalar: ScalarImpl) -> Result<Self, ScalarImpl>;

    fn wrap_array(array: ValueArray<Self>) -> ArrayImpl;

    fn unwrap_array(array: &ArrayImpl) -> Option<&ValueArray<Self>>;

    /// Heap bytes owned by the value itself, not counting its inline size.
    fn heap_size(&self) -> usize {
        0
    }
}

macro_rules! impl_copy_scalar_item {
    ($($native:ty => $variant:ident),*) => {
        $(
            impl ScalarItem for $native {
                fn as_scalar_ref(&self) -> ScalarRefImpl<'_> {
                    ScalarRefImpl::$variant(*self)
                }

                fn try_from_scalar(scalar: ScalarImpl) -> Result<Self, ScalarImpl> {
                    match scalar {
                        ScalarImpl::$variant(v) => Ok(v),
                        other => Err(other),
                    }
                }

                fn wrap_array(array: ValueArray<Self>) -> ArrayImpl {
                    ArrayImpl::$variant(array)
                }

                fn unwrap_array(array: &ArrayImpl) -> Option<&ValueArray<Self>> {
                    match array {
                        ArrayImpl::$variant(array) => Some(array),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_copy_scalar_item!(bool => Bool, i32 => Int32, i64 => Int64, F64 => Float64);

impl ScalarItem for Box<str> {
    fn as_scalar_ref(&self) -> ScalarRefImpl<'_> {
        ScalarRefImpl::Utf8(self)
    }

    fn try_from_scalar(scalar: ScalarImpl) -> Result<Self, ScalarImpl> {
        match scalar {
            ScalarImpl::Utf8(v) => Ok(v),
            other => Err(other),
        }
    }

    fn wrap_array(array: ValueArray<Self>) -> ArrayImpl {
        ArrayImpl::Utf8(array)
    }

    fn unwrap_array(array: &ArrayImpl) -> Option<&ValueArray<Self>> {
        match array {
            ArrayImpl::Utf8(array) => Some(array),
            _ => None,
        }
    }

    fn heap_size(&self) -> usize {
        self.len()
    }
}

impl ScalarItem for ListValue {
    fn as_scalar_ref(&self) -> ScalarRefImpl<'_> {
        ScalarRefImpl::List(self.values())
    }

    fn try_from_scalar(scalar: ScalarImpl) -> Result<Self, ScalarImpl> {
        match scalar {
            ScalarImpl::List(v) => Ok(v),
            other => Err(other),
        }
    }

    fn wrap_array(array: ValueArray<Self>) -> ArrayImpl {
        ArrayImpl::List(array)
    }

    fn unwrap_array(array: &ArrayImpl) -> Option<&ValueArray<Self>> {
        match array {
            ArrayImpl::List(array) => Some(array),
            _ => None,
        }
    }

    fn heap_size(&self) -> usize {
        self.values()
            .iter()
            .map(|v| {
                size_of::<ScalarImpl>()
                    + match v {
                        ScalarImpl::Utf8(s) => s.len(),
                        _ => 0,
                    }
            })
            .sum()
    }
}

/// Nullable values of one kind, addressed by slot index.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueArray<T: ScalarItem> {
    values: Vec<Option<T>>,
    /// Heap bytes owned by the values, kept up to date on every write.
    value_heap_size: usize,
}

impl<T: ScalarItem> Default for ValueArray<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            value_heap_size: 0,
        }
    }
}

impl<T: ScalarItem> FromIterator<Option<T>> for ValueArray<T> {
    fn from_iter<I: IntoIterator<Item = Option<T>>>(iter: I) -> Self {
        let values: Vec<Option<T>> = iter.into_iter().collect();
        let value_heap_size = values.iter().flatten().map(ScalarItem::heap_size).sum();
        Self {
            values,
            value_heap_size,
        }
    }
}

/// Kind-independent operations of a column.
pub trait Array: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn datum_at(&self, idx: usize) -> DatumRef<'_>;

    /// Writes `datum` into slot `idx`. A value of another kind is handed back untouched.
    fn set_datum(&mut self, idx: usize, datum: Datum) -> Result<(), ScalarImpl>;

    /// Appends `datum`. A value of another kind is handed back untouched.
    fn push_datum(&mut self, datum: Datum) -> Result<(), ScalarImpl>;

    fn push_nulls(&mut self, n: usize);

    /// Builds a new array holding the slots at `indices`, in that order.
    fn take(&self, indices: &[usize]) -> ArrayImpl;

    /// Appends the slots at `indices` of `other`. Returns `false` if `other` has another kind.
    fn append_from(&mut self, other: &ArrayImpl, indices: &[usize]) -> bool;

    fn estimated_heap_size(&self) -> usize;
}

impl<T: ScalarItem> Array for ValueArray<T> {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn datum_at(&self, idx: usize) -> DatumRef<'_> {
        self.values[idx].as_ref().map(ScalarItem::as_scalar_ref)
    }

    fn set_datum(&mut self, idx: usize, datum: Datum) -> Result<(), ScalarImpl> {
        let value = datum.map(T::try_from_scalar).transpose()?;
        if let Some(old) = &self.values[idx] {
            self.value_heap_size -= old.heap_size();
        }
        if let Some(new) = &value {
            self.value_heap_size += new.heap_size();
        }
        self.values[idx] = value;
        Ok(())
    }

    fn push_datum(&mut self, datum: Datum) -> Result<(), ScalarImpl> {
        let value = datum.map(T::try_from_scalar).transpose()?;
        if let Some(new) = &value {
            self.value_heap_size += new.heap_size();
        }
        self.values.push(value);
        Ok(())
    }

    fn push_nulls(&mut self, n: usize) {
        self.values.resize(self.values.len() + n, None);
    }

    fn take(&self, indices: &[usize]) -> ArrayImpl {
        T::wrap_array(indices.iter().map(|&i| self.values[i].clone()).collect())
    }

    fn append_from(&mut self, other: &ArrayImpl, indices: &[usize]) -> bool {
        let Some(other) = T::unwrap_array(other) else {
            return false;
        };
        self.values.reserve(indices.len());
        for &i in indices {
            let value = other.values[i].clone();
            if let Some(v) = &value {
                self.value_heap_size += v.heap_size();
            }
            self.values.push(value);
        }
        true
    }

    fn estimated_heap_size(&self) -> usize {
        self.values.capacity() * size_of::<Option<T>>() + self.value_heap_size
    }
}

/// One column of a table.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayImpl {
    Bool(ValueArray<bool>),
    Int32(ValueArray<i32>),
    Int64(ValueArray<i64>),
    Float64(ValueArray<F64>),
    Utf8(ValueArray<Box<str>>),
    List(ValueArray<ListValue>),
}

impl ArrayImpl {
    /// Creates an array of `len` nulls for `data_type`.
    pub fn new_nulls(data_type: &DataType, len: usize) -> Self {
        let mut array = match data_type {
            DataType::Boolean => ArrayImpl::Bool(ValueArray::default()),
            DataType::Int32 => ArrayImpl::Int32(ValueArray::default()),
            DataType::Int64 => ArrayImpl::Int64(ValueArray::default()),
            DataType::Float64 => ArrayImpl::Float64(ValueArray::default()),
            DataType::Varchar => ArrayImpl::Utf8(ValueArray::default()),
            DataType::List(_) => ArrayImpl::List(ValueArray::default()),
        };
        array.push_nulls(len);
        array
    }

    pub fn as_dyn(&self) -> &dyn Array {
        match self {
            ArrayImpl::Bool(a) => a,
            ArrayImpl::Int32(a) => a,
            ArrayImpl::Int64(a) => a,
            ArrayImpl::Float64(a) => a,
            ArrayImpl::Utf8(a) => a,
            ArrayImpl::List(a) => a,
        }
    }

    pub fn as_dyn_mut(&mut self) -> &mut dyn Array {
        match self {
            ArrayImpl::Bool(a) => a,
            ArrayImpl::Int32(a) => a,
            ArrayImpl::Int64(a) => a,
            ArrayImpl::Float64(a) => a,
            ArrayImpl::Utf8(a) => a,
            ArrayImpl::List(a) => a,
        }
    }

    pub fn len(&self) -> usize {
        self.as_dyn().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_dyn().is_empty()
    }

    pub fn datum_at(&self, idx: usize) -> DatumRef<'_> {
        self.as_dyn().datum_at(idx)
    }

    pub fn push_nulls(&mut self, n: usize) {
        self.as_dyn_mut().push_nulls(n)
    }

    pub fn take(&self, indices: &[usize]) -> ArrayImpl {
        self.as_dyn().take(indices)
    }

    pub fn estimated_heap_size(&self) -> usize {
        self.as_dyn().estimated_heap_size()
    }

    /// Name of the stored kind, used in diagnostics.
    pub fn get_ident(&self) -> &'static str {
        match self {
            ArrayImpl::Bool(_) => "Bool",
            ArrayImpl::Int32(_) => "Int32",
            ArrayImpl::Int64(_) => "Int64",
            ArrayImpl::Float64(_) => "Float64",
            ArrayImpl::Utf8(_) => "Utf8",
            ArrayImpl::List(_) => "List",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_take() {
        let mut array = ArrayImpl::new_nulls(&DataType::Int64, 3);
        array.as_dyn_mut().set_datum(1, Some(7i64.into())).unwrap();
        array.as_dyn_mut().push_datum(Some(9i64.into())).unwrap();
        assert_eq!(array.len(), 4);
        assert_eq!(array.datum_at(0), None);
        assert_eq!(array.datum_at(1), Some(ScalarRefImpl::Int64(7)));

        let taken = array.take(&[3, 1]);
        assert_eq!(taken.datum_at(0), Some(ScalarRefImpl::Int64(9)));
        assert_eq!(taken.datum_at(1), Some(ScalarRefImpl::Int64(7)));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut array = ArrayImpl::new_nulls(&DataType::Int32, 1);
        let rejected = array
            .as_dyn_mut()
            .set_datum(0, Some(ScalarImpl::Utf8("x".into())))
            .unwrap_err();
        assert_eq!(rejected, ScalarImpl::Utf8("x".into()));

        let other = ArrayImpl::new_nulls(&DataType::Varchar, 1);
        assert!(!array.as_dyn_mut().append_from(&other, &[0]));
    }

    #[test]
    fn test_heap_size_tracks_strings() {
        let mut array = ArrayImpl::new_nulls(&DataType::Varchar, 1);
        let before = array.estimated_heap_size();
        array
            .as_dyn_mut()
            .set_datum(0, Some(ScalarImpl::Utf8("hello".into())))
            .unwrap();
        assert_eq!(array.estimated_heap_size(), before + 5);
    }
}
