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

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A totally ordered `f64`.
///
/// Ordering follows [`f64::total_cmp`]: `-NaN < -inf < ... < -0.0 < 0.0 < ... < inf < NaN`.
/// Equality and hashing agree with that ordering, so the value can be used as a sort key and as
/// part of a group key.
#[derive(Clone, Copy, Default)]
#[repr(transparent)]
pub struct F64(f64);

impl F64 {
    pub const fn into_inner(self) -> f64 {
        self.0
    }
}

impl From<f64> for F64 {
    fn from(v: f64) -> Self {
        Self(v)
    }
}

impl From<F64> for f64 {
    fn from(v: F64) -> Self {
        v.0
    }
}

impl PartialEq for F64 {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for F64 {}

impl PartialOrd for F64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for F64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for F64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state)
    }
}

impl fmt::Debug for F64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for F64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for F64 {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<f64>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order() {
        let mut values = [3.5, f64::NAN, -1.0, f64::NEG_INFINITY, 0.0, -0.0]
            .into_iter()
            .map(F64::from)
            .collect::<Vec<_>>();
        values.sort();
        let sorted = values.iter().map(|v| v.into_inner()).collect::<Vec<_>>();
        assert_eq!(sorted[0], f64::NEG_INFINITY);
        assert_eq!(sorted[1], -1.0);
        assert!(sorted[2].is_sign_negative() && sorted[2] == 0.0);
        assert!(sorted[3].is_sign_positive() && sorted[3] == 0.0);
        assert_eq!(sorted[4], 3.5);
        assert!(sorted[5].is_nan());
        assert_eq!(F64::from(f64::NAN), F64::from(f64::NAN));
    }
}
